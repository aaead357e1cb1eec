//! Users and their physical profile.

use super::id::{ActivityId, PhysicalDataId, UserId};
use super::{require_measurement, require_text};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The owner of an entity graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawUser")]
pub struct User {
    id: UserId,
    display_name: String,
    nickname: Option<String>,
    /// File name inside the avatar store, never image bytes.
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    /// Set only on health-check users.
    #[serde(skip_serializing_if = "is_false")]
    probe: bool,
}

#[derive(Deserialize)]
struct RawUser {
    id: UserId,
    display_name: String,
    nickname: Option<String>,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    probe: bool,
}

impl TryFrom<RawUser> for User {
    type Error = ValidationError;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            display_name: require_text("display_name", raw.display_name)?,
            nickname: raw.nickname,
            avatar: raw.avatar,
            created_at: raw.created_at,
            probe: raw.probe,
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl User {
    /// Create a new user.
    pub fn new(display_name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: UserId::new(),
            display_name: require_text("display_name", display_name.into())?,
            nickname: None,
            avatar: None,
            created_at: Utc::now(),
            probe: false,
        })
    }

    /// Mark this user as a health-check record.
    pub(crate) fn into_probe(mut self) -> Self {
        self.probe = true;
        self
    }

    /// Set the nickname.
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.set_nickname(Some(nickname.into()));
        self
    }

    /// Set the creation time.
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this user was written by a health check.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Name to greet the user with.
    pub fn preferred_name(&self) -> &str {
        self.nickname().unwrap_or(&self.display_name)
    }

    pub fn rename(&mut self, display_name: impl Into<String>) -> Result<(), ValidationError> {
        self.display_name = require_text("display_name", display_name.into())?;
        Ok(())
    }

    /// Blank nicknames are stored as `None`.
    pub fn set_nickname(&mut self, nickname: Option<String>) {
        self.nickname = nickname
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
    }

    pub fn set_avatar(&mut self, avatar: Option<String>) {
        self.avatar = avatar;
    }
}

/// Height, weight and weekly goal. Owns the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPhysicalData")]
pub struct PhysicalData {
    id: PhysicalDataId,
    height_cm: f64,
    weight_kg: f64,
    weekly_activity_goal: u32,
}

#[derive(Deserialize)]
struct RawPhysicalData {
    id: PhysicalDataId,
    height_cm: f64,
    weight_kg: f64,
    weekly_activity_goal: u32,
}

impl TryFrom<RawPhysicalData> for PhysicalData {
    type Error = ValidationError;

    fn try_from(raw: RawPhysicalData) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            height_cm: require_measurement("height_cm", raw.height_cm)?,
            weight_kg: require_measurement("weight_kg", raw.weight_kg)?,
            weekly_activity_goal: raw.weekly_activity_goal,
        })
    }
}

impl PhysicalData {
    /// Default weekly goal for a fresh profile.
    pub const DEFAULT_WEEKLY_GOAL: u32 = 3;

    pub fn new(height_cm: f64, weight_kg: f64, weekly_activity_goal: u32) -> Result<Self, ValidationError> {
        Ok(Self {
            id: PhysicalDataId::new(),
            height_cm: require_measurement("height_cm", height_cm)?,
            weight_kg: require_measurement("weight_kg", weight_kg)?,
            weekly_activity_goal,
        })
    }

    /// A profile with no measurements recorded yet.
    pub fn unset() -> Self {
        Self {
            id: PhysicalDataId::new(),
            height_cm: 0.0,
            weight_kg: 0.0,
            weekly_activity_goal: Self::DEFAULT_WEEKLY_GOAL,
        }
    }

    pub fn id(&self) -> PhysicalDataId {
        self.id
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn weekly_activity_goal(&self) -> u32 {
        self.weekly_activity_goal
    }

    /// Replace both measurements; on error neither changes.
    pub fn update_measurements(&mut self, height_cm: f64, weight_kg: f64) -> Result<(), ValidationError> {
        let height_cm = require_measurement("height_cm", height_cm)?;
        let weight_kg = require_measurement("weight_kg", weight_kg)?;
        self.height_cm = height_cm;
        self.weight_kg = weight_kg;
        Ok(())
    }

    pub fn set_weekly_goal(&mut self, goal: u32) {
        self.weekly_activity_goal = goal;
    }

    /// Body mass index, if both measurements are recorded.
    pub fn bmi(&self) -> Option<f64> {
        if self.height_cm <= 0.0 || self.weight_kg <= 0.0 {
            return None;
        }
        let meters = self.height_cm / 100.0;
        Some(self.weight_kg / (meters * meters))
    }
}

impl Default for PhysicalData {
    fn default() -> Self {
        Self::unset()
    }
}

/// Types of physical activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Running,
    Walking,
    Cycling,
    Swimming,
    Yoga,
    Strength,
    Dance,
    Hiking,
    Other,
}

impl ActivityKind {
    /// Get the display name for this activity.
    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::Running => "Running",
            ActivityKind::Walking => "Walking",
            ActivityKind::Cycling => "Cycling",
            ActivityKind::Swimming => "Swimming",
            ActivityKind::Yoga => "Yoga",
            ActivityKind::Strength => "Strength Training",
            ActivityKind::Dance => "Dance",
            ActivityKind::Hiking => "Hiking",
            ActivityKind::Other => "Other",
        }
    }
}

/// One logged activity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawActivity")]
pub struct PhysicalActivity {
    id: ActivityId,
    #[serde(rename = "activity")]
    kind: ActivityKind,
    duration_minutes: u32,
    timestamp: DateTime<Utc>,
    calories_burned: f64,
}

#[derive(Deserialize)]
struct RawActivity {
    id: ActivityId,
    activity: ActivityKind,
    duration_minutes: u32,
    timestamp: DateTime<Utc>,
    calories_burned: f64,
}

impl TryFrom<RawActivity> for PhysicalActivity {
    type Error = ValidationError;

    fn try_from(raw: RawActivity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            kind: raw.activity,
            duration_minutes: raw.duration_minutes,
            timestamp: raw.timestamp,
            calories_burned: require_measurement("calories_burned", raw.calories_burned)?,
        })
    }
}

impl PhysicalActivity {
    pub fn new(kind: ActivityKind, duration_minutes: u32, calories_burned: f64) -> Result<Self, ValidationError> {
        Self::at(kind, duration_minutes, calories_burned, Utc::now())
    }

    pub fn at(
        kind: ActivityKind,
        duration_minutes: u32,
        calories_burned: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ActivityId::new(),
            kind,
            duration_minutes,
            timestamp,
            calories_burned: require_measurement("calories_burned", calories_burned)?,
        })
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn calories_burned(&self) -> f64 {
        self.calories_burned
    }
}
