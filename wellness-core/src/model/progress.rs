//! The panther companion's progression record.
//!
//! Fields are only mutated by [`crate::progression::ProgressionEngine`].

use super::id::ProgressId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Growth stage of the panther companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PantherLevel {
    Cub,
    Young,
    Adult,
}

impl PantherLevel {
    pub fn name(&self) -> &'static str {
        match self {
            PantherLevel::Cub => "Cub",
            PantherLevel::Young => "Young Panther",
            PantherLevel::Adult => "Adult Panther",
        }
    }

    /// The next stage, if any.
    pub fn next(&self) -> Option<PantherLevel> {
        match self {
            PantherLevel::Cub => Some(PantherLevel::Young),
            PantherLevel::Young => Some(PantherLevel::Adult),
            PantherLevel::Adult => None,
        }
    }
}

/// Experience ledger and daily streak for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantherProgress {
    pub(crate) id: ProgressId,
    pub(crate) experience_points: u64,
    pub(crate) current_level: PantherLevel,
    pub(crate) last_activity_date: Option<NaiveDate>,
    pub(crate) consecutive_days: u32,
    pub(crate) total_wellness_activities: u32,
}

impl PantherProgress {
    /// A fresh ledger: zero points, a cub, no streak.
    pub fn new() -> Self {
        Self {
            id: ProgressId::new(),
            experience_points: 0,
            current_level: PantherLevel::Cub,
            last_activity_date: None,
            consecutive_days: 0,
            total_wellness_activities: 0,
        }
    }

    pub fn id(&self) -> ProgressId {
        self.id
    }

    pub fn experience_points(&self) -> u64 {
        self.experience_points
    }

    pub fn current_level(&self) -> PantherLevel {
        self.current_level
    }

    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity_date
    }

    pub fn consecutive_days(&self) -> u32 {
        self.consecutive_days
    }

    pub fn total_wellness_activities(&self) -> u32 {
        self.total_wellness_activities
    }
}

impl Default for PantherProgress {
    fn default() -> Self {
        Self::new()
    }
}
