//! Entity model: plain records and their relationship declarations.
//!
//! Records hold no links to each other. Ownership lives in one place, the
//! store's `parent -> children` map, and a child's owner is always derived
//! from it (see [`crate::store::EntityGraph::owner_of`]).
//!
//! Constructors validate field invariants and return [`ValidationError`]
//! naming the offending field, so an invalid record is never observable.

mod emotion;
mod id;
mod log;
mod progress;
mod relation;
mod user;

pub use emotion::{EmotionData, EmotionKind, EmotionResponse, Intensity, MoodJar, MoodMarble};
pub use id::{
    ActivityId, EmotionId, JournalId, MarbleId, MoodJarId, PhysicalDataId, PlanId, ProgressId,
    ResponseId, SleepId, UserId,
};
pub use log::{JournalEntry, SleepData, SleepQuality, SocialPlan};
pub use progress::{PantherLevel, PantherProgress};
pub use relation::{Cardinality, EntityKind, EntityRef, Record, Relation};
pub use user::{ActivityKind, PhysicalActivity, PhysicalData, User};

use crate::error::ValidationError;

/// Trim `value` and reject it when nothing is left.
pub(crate) fn require_text(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(trimmed.to_string())
}

/// Finite, non-negative measurement.
pub(crate) fn require_measurement(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}
