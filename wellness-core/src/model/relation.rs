//! Uniform references to records and the owning relationships between them.

use super::emotion::{EmotionData, EmotionResponse, MoodJar, MoodMarble};
use super::id::*;
use super::log::{JournalEntry, SleepData, SocialPlan};
use super::progress::PantherProgress;
use super::user::{PhysicalActivity, PhysicalData, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of record the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    PhysicalData,
    PhysicalActivity,
    EmotionData,
    EmotionResponse,
    SleepData,
    JournalEntry,
    SocialPlan,
    MoodJar,
    MoodMarble,
    PantherProgress,
}

impl EntityKind {
    /// Stable snake_case name, matching the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::PhysicalData => "physical_data",
            EntityKind::PhysicalActivity => "physical_activity",
            EntityKind::EmotionData => "emotion_data",
            EntityKind::EmotionResponse => "emotion_response",
            EntityKind::SleepData => "sleep_data",
            EntityKind::JournalEntry => "journal_entry",
            EntityKind::SocialPlan => "social_plan",
            EntityKind::MoodJar => "mood_jar",
            EntityKind::MoodMarble => "mood_marble",
            EntityKind::PantherProgress => "panther_progress",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many children a parent may own through one relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

/// Owning relationships. Deleting the parent deletes the children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    UserPhysicalData,
    UserMoodJar,
    UserProgress,
    UserEmotions,
    UserSleep,
    UserJournal,
    UserSocialPlans,
    PhysicalDataActivities,
    EmotionResponses,
    MoodJarMarbles,
}

impl Relation {
    pub const ALL: [Relation; 10] = [
        Relation::UserPhysicalData,
        Relation::UserMoodJar,
        Relation::UserProgress,
        Relation::UserEmotions,
        Relation::UserSleep,
        Relation::UserJournal,
        Relation::UserSocialPlans,
        Relation::PhysicalDataActivities,
        Relation::EmotionResponses,
        Relation::MoodJarMarbles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Relation::UserPhysicalData => "user.physical_data",
            Relation::UserMoodJar => "user.mood_jar",
            Relation::UserProgress => "user.progress",
            Relation::UserEmotions => "user.emotions",
            Relation::UserSleep => "user.sleep",
            Relation::UserJournal => "user.journal",
            Relation::UserSocialPlans => "user.social_plans",
            Relation::PhysicalDataActivities => "physical_data.activities",
            Relation::EmotionResponses => "emotion.responses",
            Relation::MoodJarMarbles => "mood_jar.marbles",
        }
    }

    pub fn parent_kind(&self) -> EntityKind {
        match self {
            Relation::UserPhysicalData
            | Relation::UserMoodJar
            | Relation::UserProgress
            | Relation::UserEmotions
            | Relation::UserSleep
            | Relation::UserJournal
            | Relation::UserSocialPlans => EntityKind::User,
            Relation::PhysicalDataActivities => EntityKind::PhysicalData,
            Relation::EmotionResponses => EntityKind::EmotionData,
            Relation::MoodJarMarbles => EntityKind::MoodJar,
        }
    }

    pub fn child_kind(&self) -> EntityKind {
        match self {
            Relation::UserPhysicalData => EntityKind::PhysicalData,
            Relation::UserMoodJar => EntityKind::MoodJar,
            Relation::UserProgress => EntityKind::PantherProgress,
            Relation::UserEmotions => EntityKind::EmotionData,
            Relation::UserSleep => EntityKind::SleepData,
            Relation::UserJournal => EntityKind::JournalEntry,
            Relation::UserSocialPlans => EntityKind::SocialPlan,
            Relation::PhysicalDataActivities => EntityKind::PhysicalActivity,
            Relation::EmotionResponses => EntityKind::EmotionResponse,
            Relation::MoodJarMarbles => EntityKind::MoodMarble,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Relation::UserPhysicalData | Relation::UserMoodJar | Relation::UserProgress => {
                Cardinality::One
            }
            _ => Cardinality::Many,
        }
    }

    /// The relationship that owns records of `kind`. Users have none.
    pub fn owning(kind: EntityKind) -> Option<Relation> {
        Relation::ALL.into_iter().find(|r| r.child_kind() == kind)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! entity_table {
    ($($variant:ident($id:ident, $record:ident) => $accessor:ident),+ $(,)?) => {
        /// A typed reference to any record in the store.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "id", rename_all = "snake_case")]
        pub enum EntityRef {
            $($variant($id),)+
        }

        impl EntityRef {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(EntityRef::$variant(_) => EntityKind::$variant,)+
                }
            }

            fn id_string(&self) -> String {
                match self {
                    $(EntityRef::$variant(id) => id.to_string(),)+
                }
            }
        }

        $(
            impl From<$id> for EntityRef {
                fn from(id: $id) -> Self {
                    EntityRef::$variant(id)
                }
            }

            impl From<$record> for Record {
                fn from(record: $record) -> Self {
                    Record::$variant(record)
                }
            }
        )+

        /// Any record the store holds.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", rename_all = "snake_case")]
        pub enum Record {
            $($variant($record),)+
        }

        impl Record {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Record::$variant(_) => EntityKind::$variant,)+
                }
            }

            $(
                pub fn $accessor(&self) -> Option<&$record> {
                    match self {
                        Record::$variant(record) => Some(record),
                        _ => None,
                    }
                }
            )+
        }
    };
}

entity_table! {
    User(UserId, User) => as_user,
    PhysicalData(PhysicalDataId, PhysicalData) => as_physical_data,
    PhysicalActivity(ActivityId, PhysicalActivity) => as_activity,
    EmotionData(EmotionId, EmotionData) => as_emotion,
    EmotionResponse(ResponseId, EmotionResponse) => as_response,
    SleepData(SleepId, SleepData) => as_sleep,
    JournalEntry(JournalId, JournalEntry) => as_journal,
    SocialPlan(PlanId, SocialPlan) => as_social_plan,
    MoodJar(MoodJarId, MoodJar) => as_mood_jar,
    MoodMarble(MarbleId, MoodMarble) => as_marble,
    PantherProgress(ProgressId, PantherProgress) => as_progress,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_string())
    }
}

impl Record {
    /// Reference to this record.
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Record::User(r) => r.id().into(),
            Record::PhysicalData(r) => r.id().into(),
            Record::PhysicalActivity(r) => r.id().into(),
            Record::EmotionData(r) => r.id.into(),
            Record::EmotionResponse(r) => r.id.into(),
            Record::SleepData(r) => r.id().into(),
            Record::JournalEntry(r) => r.id().into(),
            Record::SocialPlan(r) => r.id().into(),
            Record::MoodJar(r) => r.id.into(),
            Record::MoodMarble(r) => r.id().into(),
            Record::PantherProgress(r) => r.id().into(),
        }
    }

    /// When the record happened, for records that carry a time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Record::User(r) => Some(r.created_at()),
            Record::PhysicalActivity(r) => Some(r.timestamp()),
            Record::EmotionData(r) => Some(r.timestamp),
            Record::SleepData(r) => Some(r.bed_time()),
            Record::JournalEntry(r) => Some(r.timestamp()),
            Record::SocialPlan(r) => r
                .date()
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc()),
            Record::MoodJar(r) => Some(r.created_at),
            Record::MoodMarble(r) => Some(r.created_at()),
            Record::PhysicalData(_) | Record::EmotionResponse(_) | Record::PantherProgress(_) => None,
        }
    }
}
