//! Progression engine: experience, levels and daily streaks.
//!
//! Pure computation over a [`PantherProgress`] ledger. Nothing here performs
//! I/O; the store calls these while applying a transaction, so the updated
//! ledger commits together with the action that earned it.

use crate::error::{PreconditionError, ValidationError};
use crate::model::{PantherLevel, PantherProgress};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default experience needed to become a young panther.
pub const DEFAULT_YOUNG_THRESHOLD: u64 = 100;

/// Default experience needed to become an adult panther.
pub const DEFAULT_ADULT_THRESHOLD: u64 = 500;

/// Experience totals at which each level starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThresholds {
    young: u64,
    adult: u64,
}

impl LevelThresholds {
    /// Requires `0 < young < adult`.
    pub fn new(young: u64, adult: u64) -> Result<Self, ValidationError> {
        if young == 0 || young >= adult {
            return Err(ValidationError::Thresholds { young, adult });
        }
        Ok(Self { young, adult })
    }

    pub fn young(&self) -> u64 {
        self.young
    }

    pub fn adult(&self) -> u64 {
        self.adult
    }

    /// First experience total of `level`.
    pub fn floor(&self, level: PantherLevel) -> u64 {
        match level {
            PantherLevel::Cub => 0,
            PantherLevel::Young => self.young,
            PantherLevel::Adult => self.adult,
        }
    }
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            young: DEFAULT_YOUNG_THRESHOLD,
            adult: DEFAULT_ADULT_THRESHOLD,
        }
    }
}

/// Result of an experience award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceGain {
    pub points: u64,
    pub total: u64,
    pub previous_level: PantherLevel,
    pub level: PantherLevel,
}

impl ExperienceGain {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Which path a daily-activity update took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreakUpdate {
    /// First activity ever.
    Started,
    /// Activity on the day after the last one.
    Extended { days: u32 },
    /// Activity after a gap of more than one day.
    Reset { missed_days: u32 },
    /// Already counted today.
    AlreadyCounted,
    /// `today` is before the last recorded day; nothing changed.
    Stale,
}

impl StreakUpdate {
    /// Whether the ledger changed.
    pub fn counted(&self) -> bool {
        matches!(
            self,
            StreakUpdate::Started | StreakUpdate::Extended { .. } | StreakUpdate::Reset { .. }
        )
    }
}

/// Leveling and streak rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressionEngine {
    thresholds: LevelThresholds,
}

impl ProgressionEngine {
    pub fn new(thresholds: LevelThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> LevelThresholds {
        self.thresholds
    }

    /// Level for an experience total.
    pub fn level_for(&self, points: u64) -> PantherLevel {
        if points >= self.thresholds.adult {
            PantherLevel::Adult
        } else if points >= self.thresholds.young {
            PantherLevel::Young
        } else {
            PantherLevel::Cub
        }
    }

    /// Fraction of the way from the current level's floor to the next
    /// threshold. Always 1.0 at the top level.
    pub fn progress_percentage(&self, progress: &PantherProgress) -> f64 {
        let level = self.level_for(progress.experience_points);
        let Some(next) = level.next() else {
            return 1.0;
        };
        let floor = self.thresholds.floor(level);
        let ceiling = self.thresholds.floor(next);
        (progress.experience_points - floor) as f64 / (ceiling - floor) as f64
    }

    /// Points still needed for the next level, if there is one.
    pub fn points_to_next_level(&self, progress: &PantherProgress) -> Option<u64> {
        let level = self.level_for(progress.experience_points);
        level
            .next()
            .map(|next| self.thresholds.floor(next) - progress.experience_points)
    }

    /// Add `points` to the ledger and recompute the level.
    ///
    /// Negative awards are a contract violation and leave the ledger untouched.
    pub fn add_experience(
        &self,
        progress: &mut PantherProgress,
        points: i64,
    ) -> Result<ExperienceGain, PreconditionError> {
        let points = u64::try_from(points).map_err(|_| PreconditionError::NegativeExperience(points))?;
        let total = progress
            .experience_points
            .checked_add(points)
            .ok_or(PreconditionError::ExperienceOverflow {
                total: progress.experience_points,
                points,
            })?;

        let previous_level = progress.current_level;
        progress.experience_points = total;
        progress.current_level = self.level_for(total);

        Ok(ExperienceGain {
            points,
            total,
            previous_level,
            level: progress.current_level,
        })
    }

    /// Count one qualifying day. Repeated calls on the same day are no-ops.
    pub fn update_daily_activity(&self, progress: &mut PantherProgress, today: NaiveDate) -> StreakUpdate {
        let outcome = match progress.last_activity_date {
            None => StreakUpdate::Started,
            Some(last) if today == last => return StreakUpdate::AlreadyCounted,
            Some(last) if today < last => return StreakUpdate::Stale,
            Some(last) => {
                let gap = (today - last).num_days();
                if gap == 1 {
                    StreakUpdate::Extended {
                        days: progress.consecutive_days.saturating_add(1),
                    }
                } else {
                    StreakUpdate::Reset {
                        missed_days: u32::try_from(gap - 1).unwrap_or(u32::MAX),
                    }
                }
            }
        };

        progress.consecutive_days = match outcome {
            StreakUpdate::Extended { days } => days,
            _ => 1,
        };
        progress.total_wellness_activities = progress.total_wellness_activities.saturating_add(1);
        progress.last_activity_date = Some(today);
        outcome
    }

    /// Bring a stored level in line with its points, e.g. after the
    /// thresholds were reconfigured. Returns true if it changed.
    pub fn recompute_level(&self, progress: &mut PantherProgress) -> bool {
        let level = self.level_for(progress.experience_points);
        let changed = level != progress.current_level;
        progress.current_level = level;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn test_fresh_progress_is_cub() {
        let engine = ProgressionEngine::default();
        let progress = PantherProgress::new();
        assert_eq!(progress.current_level(), PantherLevel::Cub);
        assert_eq!(engine.progress_percentage(&progress), 0.0);
        assert_eq!(engine.points_to_next_level(&progress), Some(100));
    }

    #[test]
    fn test_150_points_is_young_at_one_eighth() {
        let engine = ProgressionEngine::new(LevelThresholds::new(100, 500).unwrap());
        let mut progress = PantherProgress::new();

        let gain = engine.add_experience(&mut progress, 150).unwrap();

        assert_eq!(progress.current_level(), PantherLevel::Young);
        assert!(gain.leveled_up());
        assert_eq!(gain.total, 150);
        assert!((engine.progress_percentage(&progress) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_boundaries() {
        let engine = ProgressionEngine::default();
        assert_eq!(engine.level_for(99), PantherLevel::Cub);
        assert_eq!(engine.level_for(100), PantherLevel::Young);
        assert_eq!(engine.level_for(499), PantherLevel::Young);
        assert_eq!(engine.level_for(500), PantherLevel::Adult);
    }

    #[test]
    fn test_top_level_pinned_at_one() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.add_experience(&mut progress, 10_000).unwrap();
        assert_eq!(progress.current_level(), PantherLevel::Adult);
        assert_eq!(engine.progress_percentage(&progress), 1.0);
        assert_eq!(engine.points_to_next_level(&progress), None);
    }

    #[test]
    fn test_negative_experience_rejected() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.add_experience(&mut progress, 40).unwrap();

        let err = engine.add_experience(&mut progress, -5).unwrap_err();
        assert_eq!(err, PreconditionError::NegativeExperience(-5));
        assert_eq!(progress.experience_points(), 40);
    }

    #[test]
    fn test_overflow_rejected() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        progress.experience_points = u64::MAX - 1;
        let err = engine.add_experience(&mut progress, 5).unwrap_err();
        assert!(matches!(err, PreconditionError::ExperienceOverflow { .. }));
        assert_eq!(progress.experience_points(), u64::MAX - 1);
    }

    #[test]
    fn test_zero_points_allowed() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        let gain = engine.add_experience(&mut progress, 0).unwrap();
        assert_eq!(gain.total, 0);
        assert!(!gain.leveled_up());
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        assert_eq!(engine.update_daily_activity(&mut progress, day(5)), StreakUpdate::Started);
        assert_eq!(progress.consecutive_days(), 1);
        assert_eq!(progress.total_wellness_activities(), 1);
        assert_eq!(progress.last_activity_date(), Some(day(5)));
    }

    #[test]
    fn test_consecutive_days_extend() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.update_daily_activity(&mut progress, day(5));
        engine.update_daily_activity(&mut progress, day(6));
        let outcome = engine.update_daily_activity(&mut progress, day(7));
        assert_eq!(outcome, StreakUpdate::Extended { days: 3 });
        assert_eq!(progress.consecutive_days(), 3);
        assert_eq!(progress.total_wellness_activities(), 3);
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.update_daily_activity(&mut progress, day(5));
        let before = progress.clone();

        let outcome = engine.update_daily_activity(&mut progress, day(5));

        assert_eq!(outcome, StreakUpdate::AlreadyCounted);
        assert_eq!(progress, before);
    }

    #[test]
    fn test_gap_resets_streak() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.update_daily_activity(&mut progress, day(5));
        engine.update_daily_activity(&mut progress, day(6));

        let outcome = engine.update_daily_activity(&mut progress, day(8));

        assert_eq!(outcome, StreakUpdate::Reset { missed_days: 1 });
        assert_eq!(progress.consecutive_days(), 1);
        assert_eq!(progress.total_wellness_activities(), 3);
        assert_eq!(progress.last_activity_date(), Some(day(8)));
    }

    #[test]
    fn test_earlier_day_is_stale() {
        let engine = ProgressionEngine::default();
        let mut progress = PantherProgress::new();
        engine.update_daily_activity(&mut progress, day(9));
        let before = progress.clone();
        assert_eq!(engine.update_daily_activity(&mut progress, day(3)), StreakUpdate::Stale);
        assert_eq!(progress, before);
    }

    #[test]
    fn test_recompute_level_after_threshold_change() {
        let mut progress = PantherProgress::new();
        ProgressionEngine::default().add_experience(&mut progress, 120).unwrap();

        let strict = ProgressionEngine::new(LevelThresholds::new(200, 800).unwrap());
        assert!(strict.recompute_level(&mut progress));
        assert_eq!(progress.current_level(), PantherLevel::Cub);
        assert!(!strict.recompute_level(&mut progress));
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(LevelThresholds::new(0, 10).is_err());
        assert!(LevelThresholds::new(10, 10).is_err());
        assert!(LevelThresholds::new(50, 20).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_add_experience_is_additive(p1 in 0i64..1_000_000, p2 in 0i64..1_000_000) {
            let engine = ProgressionEngine::default();

            let mut split = PantherProgress::new();
            engine.add_experience(&mut split, p1).unwrap();
            engine.add_experience(&mut split, p2).unwrap();

            let mut single = PantherProgress::new();
            engine.add_experience(&mut single, p1 + p2).unwrap();

            prop_assert_eq!(split.experience_points(), single.experience_points());
            prop_assert_eq!(split.current_level(), single.current_level());
        }

        #[test]
        fn prop_experience_never_decreases(awards in proptest::collection::vec(-50i64..200, 1..40)) {
            let engine = ProgressionEngine::default();
            let mut progress = PantherProgress::new();
            let mut last = 0;
            for points in awards {
                let _ = engine.add_experience(&mut progress, points);
                prop_assert!(progress.experience_points() >= last);
                last = progress.experience_points();
            }
        }
    }
}
