//! Persistent entity graph and progression engine for a wellness tracker.
//!
//! This crate provides:
//! - A typed entity model with validated construction
//! - A panther progression engine (experience, levels, daily streaks)
//! - Mood jar aggregation over a bounded marble history
//! - A transactional store with relationship validation and health checks
//! - A tracker service turning user actions into single commits
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use wellness_core::{EmotionKind, StoreConfig, Tracker, WellnessStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::from_env()?;
//!     let store = Arc::new(WellnessStore::open_file(&config).await?);
//!     let tracker = Tracker::new(store);
//!
//!     let avery = tracker.register("Avery", None).await?;
//!     tracker.add_mood(avery.user, EmotionKind::Grateful, 0.9).await?;
//!
//!     let report = tracker.progress_report(avery.user).await?;
//!     println!("{:?} with {} XP", report.level, report.experience_points);
//!     Ok(())
//! }
//! ```

pub mod avatar;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod mood;
pub mod progression;
pub mod store;
pub mod testing;
pub mod tracker;

// Primary public API
pub use avatar::AvatarStore;
pub use clock::{Clock, SystemClock};
pub use config::{Rewards, StoreConfig};
pub use error::{
    AvatarError, CommitError, ConfigError, GraphError, MigrationError, PreconditionError,
    RelationshipIntegrityError, StoreError, ValidationError,
};
pub use model::{ActivityKind, EmotionKind, PantherLevel, SleepQuality};
pub use mood::{MoodJarView, MoodSummary, MoodTrend};
pub use progression::{LevelThresholds, ProgressionEngine, StreakUpdate};
pub use store::{Criteria, HealthReport, Transaction, WellnessStore};
pub use testing::{FixedClock, TestHarness};
pub use tracker::{ActionOutcome, ProgressReport, Tracker};
