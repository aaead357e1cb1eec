//! Assembled read views over a user's subtree.

use super::graph::EntityGraph;
use super::{handles_in, ledger, marbles_in};
use crate::error::GraphError;
use crate::model::{
    EmotionData, EmotionResponse, EntityRef, JournalEntry, PantherProgress, PhysicalActivity,
    PhysicalData, Record, Relation, SleepData, SocialPlan, User, UserId,
};
use crate::mood::MoodJarView;

/// An emotion check-in with its reflective answers.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionCheckIn {
    pub emotion: EmotionData,
    pub responses: Vec<EmotionResponse>,
}

/// A user and everything it owns. Collections are in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct UserGraph {
    pub user: User,
    pub physical: PhysicalData,
    pub activities: Vec<PhysicalActivity>,
    pub mood: MoodJarView,
    pub progress: PantherProgress,
    pub emotions: Vec<EmotionCheckIn>,
    pub sleep: Vec<SleepData>,
    pub journal: Vec<JournalEntry>,
    pub social_plans: Vec<SocialPlan>,
}

impl UserGraph {
    pub(crate) fn assemble(graph: &EntityGraph, user: UserId, retention: usize) -> Result<Self, GraphError> {
        let handles = handles_in(graph, user)?;
        let root = EntityRef::User(user);
        let physical_ref = EntityRef::from(handles.physical);

        let user = graph
            .get(root)
            .and_then(Record::as_user)
            .cloned()
            .ok_or(GraphError::NotFound(root))?;
        let physical = graph
            .get(physical_ref)
            .and_then(Record::as_physical_data)
            .cloned()
            .ok_or(GraphError::NotFound(physical_ref))?;

        let emotions = graph
            .children_of(root, Relation::UserEmotions)
            .into_iter()
            .filter_map(Record::as_emotion)
            .map(|emotion| EmotionCheckIn {
                responses: collect(graph, emotion.id.into(), Relation::EmotionResponses, Record::as_response),
                emotion: emotion.clone(),
            })
            .collect();

        Ok(Self {
            activities: collect(graph, physical_ref, Relation::PhysicalDataActivities, Record::as_activity),
            mood: mood_jar_view(graph, user.id(), retention)?,
            progress: ledger(graph, handles.progress)?,
            emotions,
            sleep: collect(graph, root, Relation::UserSleep, Record::as_sleep),
            journal: collect(graph, root, Relation::UserJournal, Record::as_journal),
            social_plans: collect(graph, root, Relation::UserSocialPlans, Record::as_social_plan),
            user,
            physical,
        })
    }

    /// Number of records in the view, the user included.
    pub fn record_count(&self) -> usize {
        // user, physical data, jar and progress
        4 + self.activities.len()
            + self.mood.len()
            + self
                .emotions
                .iter()
                .map(|c| 1 + c.responses.len())
                .sum::<usize>()
            + self.sleep.len()
            + self.journal.len()
            + self.social_plans.len()
    }
}

pub(crate) fn mood_jar_view(graph: &EntityGraph, user: UserId, retention: usize) -> Result<MoodJarView, GraphError> {
    let handles = handles_in(graph, user)?;
    let jar_ref = EntityRef::from(handles.mood_jar);
    let jar = graph
        .get(jar_ref)
        .and_then(Record::as_mood_jar)
        .cloned()
        .ok_or(GraphError::NotFound(jar_ref))?;
    Ok(MoodJarView::new(jar, marbles_in(graph, jar_ref)).with_retention(retention))
}

fn collect<T: Clone>(
    graph: &EntityGraph,
    parent: EntityRef,
    relation: Relation,
    pick: fn(&Record) -> Option<&T>,
) -> Vec<T> {
    graph
        .children_of(parent, relation)
        .into_iter()
        .filter_map(pick)
        .cloned()
        .collect()
}
