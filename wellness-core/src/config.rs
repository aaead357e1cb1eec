//! Store and tracker configuration.

use crate::error::ConfigError;
use crate::mood::DEFAULT_MOOD_RETENTION;
use crate::progression::LevelThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const STORE_FILE_NAME: &str = "wellness.json";
const AVATAR_DIR_NAME: &str = "avatars";

/// Experience awarded per tracked action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub activity: i64,
    pub mood: i64,
    pub emotion: i64,
    pub sleep: i64,
    pub journal: i64,
    pub social_plan: i64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            activity: 20,
            mood: 5,
            emotion: 10,
            sleep: 10,
            journal: 15,
            social_plan: 5,
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the store document and avatars.
    pub data_dir: PathBuf,

    /// Level thresholds for the progression engine.
    pub thresholds: LevelThresholds,

    /// Marbles kept per jar.
    pub mood_retention: usize,

    /// Experience per action.
    pub rewards: Rewards,
}

impl StoreConfig {
    /// Create a config rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            thresholds: LevelThresholds::default(),
            mood_retention: DEFAULT_MOOD_RETENTION,
            rewards: Rewards::default(),
        }
    }

    /// Platform data directory, e.g. `~/.local/share/wellness`.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wellness")
    }

    /// Set the level thresholds.
    pub fn with_thresholds(mut self, thresholds: LevelThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the mood retention bound. Zero is treated as one.
    pub fn with_mood_retention(mut self, retention: usize) -> Self {
        self.mood_retention = retention.max(1);
        self
    }

    /// Set the experience rewards.
    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    pub fn avatar_dir(&self) -> PathBuf {
        self.data_dir.join(AVATAR_DIR_NAME)
    }

    /// Build from the environment, loading `.env` first if present.
    ///
    /// Reads `WELLNESS_DATA_DIR`, `WELLNESS_MOOD_RETENTION`,
    /// `WELLNESS_YOUNG_THRESHOLD` and `WELLNESS_ADULT_THRESHOLD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("WELLNESS_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_data_dir);
        let mut config = Self::new(data_dir);

        if let Some(retention) = parse_var::<usize>(&lookup, "WELLNESS_MOOD_RETENTION")? {
            config = config.with_mood_retention(retention);
        }

        let young = parse_var::<u64>(&lookup, "WELLNESS_YOUNG_THRESHOLD")?;
        let adult = parse_var::<u64>(&lookup, "WELLNESS_ADULT_THRESHOLD")?;
        if young.is_some() || adult.is_some() {
            let defaults = LevelThresholds::default();
            let thresholds = LevelThresholds::new(
                young.unwrap_or(defaults.young()),
                adult.unwrap_or(defaults.adult()),
            )?;
            config = config.with_thresholds(thresholds);
        }

        Ok(config)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
