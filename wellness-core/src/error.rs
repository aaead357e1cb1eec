//! Error types for the wellness core.
//!
//! Uses thiserror for ergonomic error definition. Each concern gets its own
//! enum; [`StoreError`] is the umbrella the persistence gateway returns.

use crate::model::{EntityKind, EntityRef, Relation};
use chrono::{DateTime, Utc};

/// A field invariant was violated while constructing or mutating an entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value falls outside its permitted range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    /// Measurement that cannot be negative was negative.
    #[error("{field} cannot be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Required text was empty or whitespace.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Sleep interval ends before (or when) it starts.
    #[error("wake_time ({wake}) must be after bed_time ({bed})")]
    WakeNotAfterBed {
        bed: DateTime<Utc>,
        wake: DateTime<Utc>,
    },

    /// Value is reserved for internal use.
    #[error("{field} uses a reserved value")]
    Reserved { field: &'static str },

    /// Level thresholds are not strictly increasing from zero.
    #[error("level thresholds must satisfy 0 < young ({young}) < adult ({adult})")]
    Thresholds { young: u64, adult: u64 },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. }
            | ValidationError::NotFinite { field }
            | ValidationError::Negative { field, .. }
            | ValidationError::Empty { field }
            | ValidationError::Reserved { field } => field,
            ValidationError::WakeNotAfterBed { .. } => "wake_time",
            ValidationError::Thresholds { .. } => "thresholds",
        }
    }
}

/// A caller broke an operation's contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    /// Experience awards must be non-negative.
    #[error("experience points must be non-negative, got {0}")]
    NegativeExperience(i64),

    /// Award would overflow the ledger.
    #[error("awarding {points} experience points to a total of {total} overflows")]
    ExperienceOverflow { total: u64, points: u64 },

    /// Records of this kind are append-only or engine-owned.
    #[error("{kind} records cannot be edited in place")]
    Immutable { kind: EntityKind },

    /// A user always owns exactly one of this record.
    #[error("{0} belongs to its user for life and cannot be deleted on its own")]
    RequiredRecord(EntityRef),
}

/// A bidirectional link did not survive a round trip through storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("relationship `{}` failed validation: {reason}", .relation.name())]
pub struct RelationshipIntegrityError {
    /// The relationship under test.
    pub relation: Relation,
    /// What went wrong.
    pub reason: String,
}

impl RelationshipIntegrityError {
    pub(crate) fn new(relation: Relation, reason: impl Into<String>) -> Self {
        Self {
            relation,
            reason: reason.into(),
        }
    }
}

/// The persisted schema cannot be used by this build.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("schema version mismatch: expected {expected}, found {found}")]
    Incompatible { expected: u32, found: u32 },

    #[error("stored document has no readable schema header: {0}")]
    Unreadable(#[source] serde_json::Error),
}

/// Structural violations in the entity graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("record {0} already exists")]
    Duplicate(EntityRef),

    #[error("record {0} not found")]
    NotFound(EntityRef),

    #[error("{child} cannot be owned by {parent}")]
    InvalidParent { parent: EntityRef, child: EntityRef },

    #[error("only users can be stored without an owner, got {0}")]
    MissingOwner(EntityRef),

    #[error("{0} is listed under more than one owner")]
    MultipleOwners(EntityRef),

    #[error("{parent} already owns its `{}`", .relation.name())]
    SlotOccupied { parent: EntityRef, relation: Relation },

    #[error("{user} is missing its `{}`", .relation.name())]
    Incomplete { user: EntityRef, relation: Relation },
}

/// The underlying store write failed.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from avatar blob storage.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("invalid avatar file name: {0}")]
    InvalidName(String),

    #[error("avatar storage is not configured")]
    NotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Umbrella error returned by the persistence gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("{0}")]
    Integrity(#[from] RelationshipIntegrityError),

    #[error("Avatar error: {0}")]
    Avatar(#[from] AvatarError),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the failure happened while writing to storage.
    pub fn is_commit_failure(&self) -> bool {
        matches!(self, StoreError::Commit(_))
    }
}
