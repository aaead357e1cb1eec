//! Emotions, check-ins and mood marbles.

use super::id::{EmotionId, MarbleId, MoodJarId, ResponseId};
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emotions a user can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionKind {
    Happy,
    Grateful,
    Peaceful,
    Excited,
    Sad,
    Anxious,
    Angry,
    Tired,
    Stressed,
    Neutral,
}

impl EmotionKind {
    pub const ALL: [EmotionKind; 10] = [
        EmotionKind::Happy,
        EmotionKind::Grateful,
        EmotionKind::Peaceful,
        EmotionKind::Excited,
        EmotionKind::Sad,
        EmotionKind::Anxious,
        EmotionKind::Angry,
        EmotionKind::Tired,
        EmotionKind::Stressed,
        EmotionKind::Neutral,
    ];

    /// Get the display name for this emotion.
    pub fn name(&self) -> &'static str {
        match self {
            EmotionKind::Happy => "Happy",
            EmotionKind::Grateful => "Grateful",
            EmotionKind::Peaceful => "Peaceful",
            EmotionKind::Excited => "Excited",
            EmotionKind::Sad => "Sad",
            EmotionKind::Anxious => "Anxious",
            EmotionKind::Angry => "Angry",
            EmotionKind::Tired => "Tired",
            EmotionKind::Stressed => "Stressed",
            EmotionKind::Neutral => "Neutral",
        }
    }

    /// Whether this emotion counts as pleasant.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            EmotionKind::Happy | EmotionKind::Grateful | EmotionKind::Peaceful | EmotionKind::Excited
        )
    }
}

/// Strength of an emotion, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Intensity(f64);

impl Intensity {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 1.0;

    /// Validate `value` for the named field. The stored value equals the input.
    pub fn new(value: f64, field: &'static str) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Intensity {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Intensity::new(value, "intensity")
    }
}

impl From<Intensity> for f64 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

/// An emotion check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionData {
    pub id: EmotionId,
    pub emotion: EmotionKind,
    pub intensity: Intensity,
    pub timestamp: DateTime<Utc>,
}

impl EmotionData {
    pub fn new(emotion: EmotionKind, intensity: f64) -> Result<Self, ValidationError> {
        Ok(Self {
            id: EmotionId::new(),
            emotion,
            intensity: Intensity::new(intensity, "intensity")?,
            timestamp: Utc::now(),
        })
    }

    /// Set when the check-in happened.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A reflective question and the user's answer, attached to a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionResponse {
    pub id: ResponseId,
    pub question: String,
    pub answer: String,
}

impl EmotionResponse {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ResponseId::new(),
            question: super::require_text("question", question.into())?,
            answer: answer.into(),
        })
    }
}

/// Container for a user's mood marbles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodJar {
    pub id: MoodJarId,
    pub created_at: DateTime<Utc>,
}

impl MoodJar {
    pub fn new() -> Self {
        Self {
            id: MoodJarId::new(),
            created_at: Utc::now(),
        }
    }
}

impl Default for MoodJar {
    fn default() -> Self {
        Self::new()
    }
}

/// One mood sample. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodMarble {
    id: MarbleId,
    emotion: EmotionKind,
    intensity: Intensity,
    created_at: DateTime<Utc>,
}

impl MoodMarble {
    /// Create a marble stamped with the current time.
    pub fn new(emotion: EmotionKind, intensity: f64) -> Result<Self, ValidationError> {
        Self::at(emotion, intensity, Utc::now())
    }

    /// Create a marble with an explicit creation time.
    pub fn at(
        emotion: EmotionKind,
        intensity: f64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: MarbleId::new(),
            emotion,
            intensity: Intensity::new(intensity, "intensity")?,
            created_at,
        })
    }

    pub fn id(&self) -> MarbleId {
        self.id
    }

    pub fn emotion(&self) -> EmotionKind {
        self.emotion
    }

    pub fn intensity(&self) -> f64 {
        self.intensity.value()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
