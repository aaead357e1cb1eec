//! Type-safe ID types for every entity in the graph.
//!
//! Uses newtype pattern to prevent mixing up different ID types at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to define a newtype ID wrapper around UUID
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an ID from an existing UUID
            #[inline]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID
            #[inline]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(
    /// Identifies a user, the root of an entity graph.
    UserId
);
define_id!(
    /// Identifies a user's physical profile.
    PhysicalDataId
);
define_id!(
    /// Identifies one logged physical activity.
    ActivityId
);
define_id!(
    /// Identifies an emotion check-in.
    EmotionId
);
define_id!(
    /// Identifies a question/answer pair attached to a check-in.
    ResponseId
);
define_id!(
    /// Identifies a sleep log.
    SleepId
);
define_id!(
    /// Identifies a journal entry.
    JournalId
);
define_id!(
    /// Identifies a social plan.
    PlanId
);
define_id!(
    /// Identifies a mood jar.
    MoodJarId
);
define_id!(
    /// Identifies a single mood marble.
    MarbleId
);
define_id!(
    /// Identifies a progression ledger.
    ProgressId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn test_id_parse_round_trip() {
        let id = MarbleId::new();
        let parsed: MarbleId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_serializes_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let id = JournalId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn test_debug_is_short() {
        let debug = format!("{:?}", SleepId::new());
        assert!(debug.starts_with("SleepId("));
        assert_eq!(debug.len(), "SleepId(".len() + 8 + 1);
    }
}
