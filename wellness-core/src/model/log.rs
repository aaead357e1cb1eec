//! Sleep logs, journal entries and social plans.

use super::id::{JournalId, PlanId, SleepId};
use super::require_text;
use crate::error::ValidationError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How restful a night was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SleepQuality {
    pub fn name(&self) -> &'static str {
        match self {
            SleepQuality::Poor => "Poor",
            SleepQuality::Fair => "Fair",
            SleepQuality::Good => "Good",
            SleepQuality::Excellent => "Excellent",
        }
    }
}

/// One night of sleep. `wake_time` is always after `bed_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSleepData")]
pub struct SleepData {
    id: SleepId,
    bed_time: DateTime<Utc>,
    wake_time: DateTime<Utc>,
    quality: SleepQuality,
    notes: String,
}

#[derive(Deserialize)]
struct RawSleepData {
    id: SleepId,
    bed_time: DateTime<Utc>,
    wake_time: DateTime<Utc>,
    quality: SleepQuality,
    #[serde(default)]
    notes: String,
}

impl TryFrom<RawSleepData> for SleepData {
    type Error = ValidationError;

    fn try_from(raw: RawSleepData) -> Result<Self, Self::Error> {
        check_interval(raw.bed_time, raw.wake_time)?;
        Ok(Self {
            id: raw.id,
            bed_time: raw.bed_time,
            wake_time: raw.wake_time,
            quality: raw.quality,
            notes: raw.notes,
        })
    }
}

impl SleepData {
    pub fn new(
        bed_time: DateTime<Utc>,
        wake_time: DateTime<Utc>,
        quality: SleepQuality,
    ) -> Result<Self, ValidationError> {
        check_interval(bed_time, wake_time)?;
        Ok(Self {
            id: SleepId::new(),
            bed_time,
            wake_time,
            quality,
            notes: String::new(),
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn id(&self) -> SleepId {
        self.id
    }

    pub fn bed_time(&self) -> DateTime<Utc> {
        self.bed_time
    }

    pub fn wake_time(&self) -> DateTime<Utc> {
        self.wake_time
    }

    pub fn quality(&self) -> SleepQuality {
        self.quality
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn duration(&self) -> Duration {
        self.wake_time - self.bed_time
    }

    /// Move the interval; on error the log is unchanged.
    pub fn reschedule(&mut self, bed_time: DateTime<Utc>, wake_time: DateTime<Utc>) -> Result<(), ValidationError> {
        check_interval(bed_time, wake_time)?;
        self.bed_time = bed_time;
        self.wake_time = wake_time;
        Ok(())
    }

    pub fn set_quality(&mut self, quality: SleepQuality) {
        self.quality = quality;
    }
}

fn check_interval(bed: DateTime<Utc>, wake: DateTime<Utc>) -> Result<(), ValidationError> {
    if wake <= bed {
        return Err(ValidationError::WakeNotAfterBed { bed, wake });
    }
    Ok(())
}

/// A free-text journal entry. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJournalEntry")]
pub struct JournalEntry {
    id: JournalId,
    text: String,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawJournalEntry {
    id: JournalId,
    text: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawJournalEntry> for JournalEntry {
    type Error = ValidationError;

    fn try_from(raw: RawJournalEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            text: require_text("text", raw.text)?,
            timestamp: raw.timestamp,
        })
    }
}

impl JournalEntry {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::at(text, Utc::now())
    }

    pub fn at(text: impl Into<String>, timestamp: DateTime<Utc>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: JournalId::new(),
            text: require_text("text", text.into())?,
            timestamp,
        })
    }

    pub fn id(&self) -> JournalId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Something the user plans to do with other people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSocialPlan")]
pub struct SocialPlan {
    id: PlanId,
    title: String,
    date: NaiveDate,
}

#[derive(Deserialize)]
struct RawSocialPlan {
    id: PlanId,
    title: String,
    date: NaiveDate,
}

impl TryFrom<RawSocialPlan> for SocialPlan {
    type Error = ValidationError;

    fn try_from(raw: RawSocialPlan) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            title: require_text("title", raw.title)?,
            date: raw.date,
        })
    }
}

impl SocialPlan {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Result<Self, ValidationError> {
        Ok(Self {
            id: PlanId::new(),
            title: require_text("title", title.into())?,
            date,
        })
    }

    pub fn id(&self) -> PlanId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date >= today
    }
}
