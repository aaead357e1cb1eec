//! Transactions: ordered mutations committed all-or-nothing.

use crate::model::{
    EntityRef, MoodJar, MoodJarId, MoodMarble, PantherProgress, PhysicalData, PhysicalDataId,
    ProgressId, Record, User, UserId,
};
use crate::progression::{ExperienceGain, StreakUpdate};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One change to the entity graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a record. `None` parent is only valid for users.
    Insert {
        parent: Option<EntityRef>,
        record: Record,
    },
    /// Replace an existing record, keeping its place in the graph.
    Update(Record),
    /// Remove a record and everything it owns.
    Delete(EntityRef),
    /// Append a marble to a jar, evicting beyond the retention bound.
    AddMarble { jar: MoodJarId, marble: MoodMarble },
    /// Run the progression engine's experience award.
    AwardExperience { progress: ProgressId, points: i64 },
    /// Run the progression engine's daily streak gate.
    RecordDailyActivity { progress: ProgressId, today: NaiveDate },
}

/// A new user together with the records it always owns.
#[derive(Debug, Clone, PartialEq)]
pub struct UserBundle {
    pub user: User,
    pub physical: PhysicalData,
    pub mood_jar: MoodJar,
    pub progress: PantherProgress,
}

impl UserBundle {
    pub fn new(user: User) -> Self {
        Self {
            user,
            physical: PhysicalData::unset(),
            mood_jar: MoodJar::new(),
            progress: PantherProgress::new(),
        }
    }

    pub fn with_physical_data(mut self, physical: PhysicalData) -> Self {
        self.physical = physical;
        self
    }

    /// Ids of the bundle's records.
    pub fn handles(&self) -> UserHandles {
        UserHandles {
            user: self.user.id(),
            physical: self.physical.id(),
            mood_jar: self.mood_jar.id,
            progress: self.progress.id(),
        }
    }
}

/// Ids of a user and its one-to-one children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserHandles {
    pub user: UserId,
    pub physical: PhysicalDataId,
    pub mood_jar: MoodJarId,
    pub progress: ProgressId,
}

/// An ordered list of mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    mutations: Vec<Mutation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user and its physical data, mood jar and progress.
    pub fn create_user(self, bundle: UserBundle) -> Self {
        let user = EntityRef::User(bundle.user.id());
        self.insert_root(bundle.user)
            .insert(user, bundle.physical)
            .insert(user, bundle.mood_jar)
            .insert(user, bundle.progress)
    }

    /// Insert a bare user. The commit fails unless the same transaction
    /// also gives it physical data, a mood jar and progress.
    pub fn insert_root(mut self, user: User) -> Self {
        self.mutations.push(Mutation::Insert {
            parent: None,
            record: user.into(),
        });
        self
    }

    /// Append `record` to `parent`'s collection.
    pub fn insert(mut self, parent: impl Into<EntityRef>, record: impl Into<Record>) -> Self {
        self.mutations.push(Mutation::Insert {
            parent: Some(parent.into()),
            record: record.into(),
        });
        self
    }

    pub fn update(mut self, record: impl Into<Record>) -> Self {
        self.mutations.push(Mutation::Update(record.into()));
        self
    }

    pub fn delete(mut self, entity: impl Into<EntityRef>) -> Self {
        self.mutations.push(Mutation::Delete(entity.into()));
        self
    }

    pub fn add_marble(mut self, jar: MoodJarId, marble: MoodMarble) -> Self {
        self.mutations.push(Mutation::AddMarble { jar, marble });
        self
    }

    pub fn award_experience(mut self, progress: ProgressId, points: i64) -> Self {
        self.mutations.push(Mutation::AwardExperience { progress, points });
        self
    }

    pub fn record_daily_activity(mut self, progress: ProgressId, today: NaiveDate) -> Self {
        self.mutations
            .push(Mutation::RecordDailyActivity { progress, today });
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub(crate) fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }
}

/// Progression outcomes produced while applying a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    Experience(ExperienceGain),
    Streak(StreakUpdate),
}

/// What a committed transaction did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub committed_at: DateTime<Utc>,
    pub inserted: Vec<EntityRef>,
    pub updated: Vec<EntityRef>,
    /// Explicitly deleted records and their cascaded children.
    pub removed: Vec<EntityRef>,
    /// Marbles dropped by the retention bound.
    pub evicted: Vec<EntityRef>,
    pub progress: Vec<ProgressEvent>,
}

impl CommitReceipt {
    pub(crate) fn new() -> Self {
        Self {
            committed_at: Utc::now(),
            inserted: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            evicted: Vec::new(),
            progress: Vec::new(),
        }
    }

    /// The first experience award in the transaction.
    pub fn experience(&self) -> Option<ExperienceGain> {
        self.progress.iter().find_map(|e| match e {
            ProgressEvent::Experience(gain) => Some(*gain),
            _ => None,
        })
    }

    pub fn streak(&self) -> Option<StreakUpdate> {
        self.progress.iter().find_map(|e| match e {
            ProgressEvent::Streak(update) => Some(*update),
            _ => None,
        })
    }
}
