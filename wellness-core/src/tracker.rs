//! The tracker: user actions as single transactions.
//!
//! Every wellness action writes its record, awards experience and runs the
//! daily streak gate in one commit, so a logged activity and the points it
//! earned are never seen apart.

use crate::avatar::AvatarStore;
use crate::clock::{Clock, SystemClock};
use crate::config::Rewards;
use crate::error::{AvatarError, GraphError, StoreError};
use crate::model::{
    ActivityKind, EmotionData, EmotionKind, EmotionResponse, EntityRef, JournalEntry, MoodMarble,
    PantherLevel, PhysicalActivity, PhysicalData, PlanId, Record, Relation, SleepData, SleepQuality,
    SocialPlan, User, UserId,
};
use crate::mood::{MoodSummary, DEFAULT_SUMMARY_WINDOW};
use crate::progression::{ExperienceGain, StreakUpdate};
use crate::store::{Transaction, UserBundle, UserHandles, WellnessStore};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// What a tracked action committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// The record the action created.
    pub record: EntityRef,
    pub experience: Option<ExperienceGain>,
    pub streak: Option<StreakUpdate>,
    /// Marbles dropped by the retention bound.
    pub evicted: Vec<EntityRef>,
}

impl ActionOutcome {
    pub fn leveled_up(&self) -> bool {
        self.experience.is_some_and(|gain| gain.leveled_up())
    }
}

/// Progress as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub level: PantherLevel,
    pub experience_points: u64,
    pub progress_percentage: f64,
    pub points_to_next_level: Option<u64>,
    pub consecutive_days: u32,
    pub total_wellness_activities: u32,
    pub last_activity_date: Option<NaiveDate>,
}

/// Service the UI calls for every user action.
pub struct Tracker<C: Clock = SystemClock> {
    store: Arc<WellnessStore>,
    clock: C,
    rewards: Rewards,
    avatars: Option<AvatarStore>,
}

impl Tracker<SystemClock> {
    /// Tracker on the wall clock with default rewards.
    pub fn new(store: Arc<WellnessStore>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock> Tracker<C> {
    pub fn with_clock(store: Arc<WellnessStore>, clock: C) -> Self {
        Self {
            store,
            clock,
            rewards: Rewards::default(),
            avatars: None,
        }
    }

    /// Set the experience rewards.
    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    /// Enable avatar uploads.
    pub fn with_avatars(mut self, avatars: AvatarStore) -> Self {
        self.avatars = Some(avatars);
        self
    }

    pub fn store(&self) -> &Arc<WellnessStore> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Create a user with fresh physical data, mood jar and progress.
    pub async fn register(&self, display_name: &str, nickname: Option<&str>) -> Result<UserHandles, StoreError> {
        let mut user = User::new(display_name)?.created(self.clock.now());
        user.set_nickname(nickname.map(str::to_string));

        let bundle = UserBundle::new(user);
        let handles = bundle.handles();
        self.store.save(Transaction::new().create_user(bundle)).await?;
        info!(user = %handles.user, "registered user");
        Ok(handles)
    }

    pub async fn rename(&self, user: UserId, display_name: &str) -> Result<User, StoreError> {
        let mut record = self.require_user(user).await?;
        record.rename(display_name)?;
        self.store.save(Transaction::new().update(record.clone())).await?;
        Ok(record)
    }

    pub async fn set_nickname(&self, user: UserId, nickname: Option<&str>) -> Result<User, StoreError> {
        let mut record = self.require_user(user).await?;
        record.set_nickname(nickname.map(str::to_string));
        self.store.save(Transaction::new().update(record.clone())).await?;
        Ok(record)
    }

    /// Replace height and weight, and optionally the weekly goal.
    pub async fn update_physical(
        &self,
        user: UserId,
        height_cm: f64,
        weight_kg: f64,
        weekly_goal: Option<u32>,
    ) -> Result<PhysicalData, StoreError> {
        let handles = self.store.handles(user).await?;
        let mut physical = self
            .store
            .get(handles.physical)
            .await
            .and_then(|r| r.as_physical_data().cloned())
            .ok_or(GraphError::NotFound(handles.physical.into()))?;
        physical.update_measurements(height_cm, weight_kg)?;
        if let Some(goal) = weekly_goal {
            physical.set_weekly_goal(goal);
        }
        self.store.save(Transaction::new().update(physical.clone())).await?;
        Ok(physical)
    }

    pub async fn log_activity(
        &self,
        user: UserId,
        kind: ActivityKind,
        duration_minutes: u32,
        calories_burned: f64,
    ) -> Result<ActionOutcome, StoreError> {
        let activity = PhysicalActivity::at(kind, duration_minutes, calories_burned, self.clock.now())?;
        let record = EntityRef::from(activity.id());
        self.act(user, self.rewards.activity, record, |h| {
            Transaction::new().insert(h.physical, activity)
        })
        .await
    }

    /// Drop a marble into the user's mood jar.
    pub async fn add_mood(&self, user: UserId, emotion: EmotionKind, intensity: f64) -> Result<ActionOutcome, StoreError> {
        let marble = MoodMarble::at(emotion, intensity, self.clock.now())?;
        let record = EntityRef::from(marble.id());
        self.act(user, self.rewards.mood, record, |h| {
            Transaction::new().add_marble(h.mood_jar, marble)
        })
        .await
    }

    /// Record an emotion with its reflective question/answer pairs.
    pub async fn check_in_emotion(
        &self,
        user: UserId,
        emotion: EmotionKind,
        intensity: f64,
        responses: &[(&str, &str)],
    ) -> Result<ActionOutcome, StoreError> {
        let check_in = EmotionData::new(emotion, intensity)?.at(self.clock.now());
        let record = EntityRef::from(check_in.id);
        let answers = responses
            .iter()
            .map(|(question, answer)| EmotionResponse::new(*question, *answer))
            .collect::<Result<Vec<_>, _>>()?;

        self.act(user, self.rewards.emotion, record, |h| {
            answers
                .into_iter()
                .fold(Transaction::new().insert(h.user, check_in), |tx, answer| {
                    tx.insert(record, answer)
                })
        })
        .await
    }

    pub async fn log_sleep(
        &self,
        user: UserId,
        bed_time: DateTime<Utc>,
        wake_time: DateTime<Utc>,
        quality: SleepQuality,
        notes: Option<&str>,
    ) -> Result<ActionOutcome, StoreError> {
        let mut sleep = SleepData::new(bed_time, wake_time, quality)?;
        if let Some(notes) = notes {
            sleep = sleep.with_notes(notes);
        }
        let record = EntityRef::from(sleep.id());
        self.act(user, self.rewards.sleep, record, |h| Transaction::new().insert(h.user, sleep))
            .await
    }

    pub async fn write_journal(&self, user: UserId, text: &str) -> Result<ActionOutcome, StoreError> {
        let entry = JournalEntry::at(text, self.clock.now())?;
        let record = EntityRef::from(entry.id());
        self.act(user, self.rewards.journal, record, |h| Transaction::new().insert(h.user, entry))
            .await
    }

    pub async fn plan_social(&self, user: UserId, title: &str, date: NaiveDate) -> Result<ActionOutcome, StoreError> {
        let plan = SocialPlan::new(title, date)?;
        let record = EntityRef::from(plan.id());
        self.act(user, self.rewards.social_plan, record, |h| Transaction::new().insert(h.user, plan))
            .await
    }

    pub async fn cancel_social_plan(&self, plan: PlanId) -> Result<(), StoreError> {
        self.store.delete(plan).await?;
        Ok(())
    }

    /// Store a new avatar image and point the user at it.
    ///
    /// The previous image is removed once the user record is committed. If
    /// the commit fails the new image is removed instead.
    pub async fn set_avatar(&self, user: UserId, bytes: &[u8], extension: &str) -> Result<String, StoreError> {
        let avatars = self.avatar_store()?;
        let mut record = self.require_user(user).await?;
        let previous = record.avatar().map(str::to_string);

        let name = avatars.save(bytes, extension).await?;
        record.set_avatar(Some(name.clone()));
        if let Err(e) = self.store.save(Transaction::new().update(record)).await {
            if let Err(cleanup) = avatars.remove(&name).await {
                warn!(file = %name, error = %cleanup, "failed to remove orphaned avatar");
            }
            return Err(e);
        }

        if let Some(previous) = previous {
            if let Err(e) = avatars.remove(&previous).await {
                warn!(file = %previous, error = %e, "failed to remove replaced avatar");
            }
        }
        Ok(name)
    }

    pub async fn avatar(&self, user: UserId) -> Result<Option<Vec<u8>>, StoreError> {
        let record = self.require_user(user).await?;
        match (record.avatar(), &self.avatars) {
            (Some(name), Some(avatars)) => Ok(Some(avatars.load(name).await?)),
            _ => Ok(None),
        }
    }

    /// Delete a user, everything it owns, and its avatar file.
    pub async fn delete_user(&self, user: UserId) -> Result<Vec<EntityRef>, StoreError> {
        let record = self.require_user(user).await?;
        let removed = self.store.delete(user).await?;
        info!(user = %user, records = removed.len(), "deleted user");

        if let (Some(name), Some(avatars)) = (record.avatar(), &self.avatars) {
            if let Err(e) = avatars.remove(name).await {
                warn!(file = %name, error = %e, "failed to remove avatar of deleted user");
            }
        }
        Ok(removed)
    }

    /// Journal entries, newest first.
    pub async fn journal(&self, user: UserId) -> Vec<JournalEntry> {
        let mut entries: Vec<JournalEntry> = self
            .store
            .children(user, Relation::UserJournal)
            .await
            .iter()
            .filter_map(Record::as_journal)
            .cloned()
            .collect();
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        entries
    }

    /// Plans dated today or later, soonest first.
    pub async fn upcoming_plans(&self, user: UserId) -> Vec<SocialPlan> {
        let today = self.clock.today();
        let mut plans: Vec<SocialPlan> = self
            .store
            .children(user, Relation::UserSocialPlans)
            .await
            .iter()
            .filter_map(Record::as_social_plan)
            .filter(|p| p.is_upcoming(today))
            .cloned()
            .collect();
        plans.sort_by_key(SocialPlan::date);
        plans
    }

    pub async fn mood_summary(&self, user: UserId) -> Result<MoodSummary, StoreError> {
        Ok(self.store.mood_jar(user).await?.summary(DEFAULT_SUMMARY_WINDOW))
    }

    pub async fn progress_report(&self, user: UserId) -> Result<ProgressReport, StoreError> {
        let progress = self.store.progress(user).await?;
        let engine = self.store.engine();
        Ok(ProgressReport {
            level: progress.current_level(),
            experience_points: progress.experience_points(),
            progress_percentage: engine.progress_percentage(&progress),
            points_to_next_level: engine.points_to_next_level(&progress),
            consecutive_days: progress.consecutive_days(),
            total_wellness_activities: progress.total_wellness_activities(),
            last_activity_date: progress.last_activity_date(),
        })
    }

    /// Commit `build`'s records with the action's reward and streak update.
    async fn act(
        &self,
        user: UserId,
        points: i64,
        record: EntityRef,
        build: impl FnOnce(&UserHandles) -> Transaction,
    ) -> Result<ActionOutcome, StoreError> {
        let handles = self.store.handles(user).await?;
        let tx = build(&handles)
            .award_experience(handles.progress, points)
            .record_daily_activity(handles.progress, self.clock.today());

        let receipt = self.store.save(tx).await?;
        Ok(ActionOutcome {
            record,
            experience: receipt.experience(),
            streak: receipt.streak(),
            evicted: receipt.evicted,
        })
    }

    async fn require_user(&self, user: UserId) -> Result<User, StoreError> {
        self.store
            .user(user)
            .await
            .ok_or_else(|| GraphError::NotFound(user.into()).into())
    }

    fn avatar_store(&self) -> Result<&AvatarStore, StoreError> {
        self.avatars
            .as_ref()
            .ok_or(StoreError::Avatar(AvatarError::NotConfigured))
    }
}
