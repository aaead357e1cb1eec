//! Mood aggregation over a jar of marbles.
//!
//! Marbles are kept in insertion order, which is chronological order. The
//! newest marble is the current mood; summaries look at a recent window.
//! A jar holds at most `retention` marbles. The store evicts the oldest in
//! the commit that appends past the bound; views are read-only.

use crate::model::{EmotionKind, MoodJar, MoodMarble};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default number of marbles a jar keeps.
pub const DEFAULT_MOOD_RETENTION: usize = 500;

/// Window used by [`MoodJarView::summary`].
pub const DEFAULT_SUMMARY_WINDOW: usize = 14;

/// Mean-intensity change below which a trend is steady.
const TREND_DEAD_BAND: f64 = 0.1;

/// How many marbles must go so that `len` fits in `retention`.
pub fn overflow(len: usize, retention: usize) -> usize {
    len.saturating_sub(retention)
}

/// The most recent mood sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentMood {
    pub emotion: EmotionKind,
    pub intensity: f64,
    pub at: DateTime<Utc>,
}

/// Direction of mood intensity across a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoodTrend {
    Rising,
    Falling,
    Steady,
}

/// Summary of a recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSummary {
    pub window: usize,
    pub sample_count: usize,
    pub current: Option<CurrentMood>,
    pub dominant: Option<EmotionKind>,
    pub average_intensity: Option<f64>,
    pub trend: MoodTrend,
}

/// A mood jar together with its marbles, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodJarView {
    jar: MoodJar,
    marbles: Vec<MoodMarble>,
    retention: usize,
}

impl MoodJarView {
    pub fn new(jar: MoodJar, marbles: Vec<MoodMarble>) -> Self {
        Self {
            jar,
            marbles,
            retention: DEFAULT_MOOD_RETENTION,
        }
    }

    /// Record the retention bound the store enforces on this jar.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn jar(&self) -> &MoodJar {
        &self.jar
    }

    pub fn marbles(&self) -> &[MoodMarble] {
        &self.marbles
    }

    pub fn len(&self) -> usize {
        self.marbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marbles.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Emotion and intensity of the newest marble.
    pub fn current_mood(&self) -> Option<CurrentMood> {
        self.marbles.last().map(|m| CurrentMood {
            emotion: m.emotion(),
            intensity: m.intensity(),
            at: m.created_at(),
        })
    }

    /// The last `window` marbles, oldest first.
    pub fn recent(&self, window: usize) -> &[MoodMarble] {
        let start = self.marbles.len().saturating_sub(window);
        &self.marbles[start..]
    }

    /// How often each emotion appears in the window.
    pub fn counts(&self, window: usize) -> HashMap<EmotionKind, usize> {
        let mut counts = HashMap::new();
        for marble in self.recent(window) {
            *counts.entry(marble.emotion()).or_insert(0) += 1;
        }
        counts
    }

    /// Most frequent emotion in the window; ties go to the one seen most recently.
    pub fn dominant_emotion(&self, window: usize) -> Option<EmotionKind> {
        let recent = self.recent(window);
        let counts = self.counts(window);
        let best = counts.values().copied().max()?;
        recent
            .iter()
            .rev()
            .map(|m| m.emotion())
            .find(|emotion| counts.get(emotion) == Some(&best))
    }

    pub fn average_intensity(&self, window: usize) -> Option<f64> {
        mean(self.recent(window))
    }

    /// Compare mean intensity of the older and newer halves of the window.
    pub fn trend(&self, window: usize) -> MoodTrend {
        let recent = self.recent(window);
        if recent.len() < 2 {
            return MoodTrend::Steady;
        }
        let (older, newer) = recent.split_at(recent.len() / 2);
        match (mean(older), mean(newer)) {
            (Some(before), Some(after)) if after - before > TREND_DEAD_BAND => MoodTrend::Rising,
            (Some(before), Some(after)) if before - after > TREND_DEAD_BAND => MoodTrend::Falling,
            _ => MoodTrend::Steady,
        }
    }

    pub fn summary(&self, window: usize) -> MoodSummary {
        MoodSummary {
            window,
            sample_count: self.recent(window).len(),
            current: self.current_mood(),
            dominant: self.dominant_emotion(window),
            average_intensity: self.average_intensity(window),
            trend: self.trend(window),
        }
    }
}

fn mean(marbles: &[MoodMarble]) -> Option<f64> {
    if marbles.is_empty() {
        return None;
    }
    let total: f64 = marbles.iter().map(|m| m.intensity()).sum();
    Some(total / marbles.len() as f64)
}
