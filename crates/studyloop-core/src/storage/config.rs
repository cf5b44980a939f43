//! TOML-based application configuration.
//!
//! Stores the tunable reward and review settings:
//! - Reward delay and the coins/experience each reward grants
//! - Review intervals and the UTC offset that defines "start of day"
//!
//! Configuration is stored at `~/.config/studyloop/config.toml`.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::reward::{RewardAmounts, RewardPolicy, DEFAULT_REWARD_DELAY_SECS};
use crate::task::lifecycle::LifecycleSettings;
use crate::task::review::{
    ReviewSchedule, DEFAULT_FIRST_REVIEW_DAYS, DEFAULT_SECOND_REVIEW_DAYS,
    MAX_REVIEW_INTERVAL_DAYS,
};

/// Largest offset a real time zone uses, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Reward configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    #[serde(default = "default_completion_coins")]
    pub completion_coins: u64,
    #[serde(default = "default_completion_experience")]
    pub completion_experience: u64,
    #[serde(default = "default_review_coins")]
    pub review_coins: u64,
    #[serde(default = "default_review_experience")]
    pub review_experience: u64,
}

/// Review scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_first_interval_days")]
    pub first_interval_days: u32,
    #[serde(default = "default_second_interval_days")]
    pub second_interval_days: u32,
    /// Minutes east of UTC used to find local midnight.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studyloop/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

// Default functions
fn default_delay_seconds() -> u64 {
    DEFAULT_REWARD_DELAY_SECS
}
fn default_completion_coins() -> u64 {
    RewardAmounts::COMPLETION.coins
}
fn default_completion_experience() -> u64 {
    RewardAmounts::COMPLETION.experience
}
fn default_review_coins() -> u64 {
    RewardAmounts::REVIEW.coins
}
fn default_review_experience() -> u64 {
    RewardAmounts::REVIEW.experience
}
fn default_first_interval_days() -> u32 {
    DEFAULT_FIRST_REVIEW_DAYS
}
fn default_second_interval_days() -> u32 {
    DEFAULT_SECOND_REVIEW_DAYS
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            completion_coins: default_completion_coins(),
            completion_experience: default_completion_experience(),
            review_coins: default_review_coins(),
            review_experience: default_review_experience(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            first_interval_days: default_first_interval_days(),
            second_interval_days: default_second_interval_days(),
            utc_offset_minutes: 0,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) => return Err(unknown()),
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Ok(Self::load_from(&path)?)
    }

    /// Load and validate the config at `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), CoreError> {
        Ok(self.save_to(&Self::path()?)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default config");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a leaf value by dot-separated key.
    ///
    /// The change is validated but not saved; call [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// All leaf keys with their current values, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        if let Ok(serde_json::Value::Object(sections)) = serde_json::to_value(self) {
            for (section, values) in sections {
                if let serde_json::Value::Object(values) = values {
                    for (name, value) in values {
                        entries.push((format!("{section}.{name}"), value.to_string()));
                    }
                }
            }
        }
        entries
    }

    /// Restore every setting to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.rewards.delay_seconds == 0 {
            return Err(invalid("rewards.delay_seconds", "must be greater than 0"));
        }
        let intervals = [
            ("review.first_interval_days", self.review.first_interval_days),
            ("review.second_interval_days", self.review.second_interval_days),
        ];
        for (key, days) in intervals {
            if days == 0 || days > MAX_REVIEW_INTERVAL_DAYS {
                return Err(invalid(
                    key,
                    &format!("must be within 1..={MAX_REVIEW_INTERVAL_DAYS} days"),
                ));
            }
        }
        if self.review.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(invalid(
                "review.utc_offset_minutes",
                "must be within -840..=840",
            ));
        }
        Ok(())
    }

    pub fn reward_policy(&self) -> RewardPolicy {
        RewardPolicy::new(self.rewards.delay_seconds)
    }

    pub fn completion_reward(&self) -> RewardAmounts {
        RewardAmounts::new(self.rewards.completion_coins, self.rewards.completion_experience)
    }

    pub fn review_reward(&self) -> RewardAmounts {
        RewardAmounts::new(self.rewards.review_coins, self.rewards.review_experience)
    }

    pub fn review_schedule(&self) -> ReviewSchedule {
        let offset = FixedOffset::east_opt(self.review.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| {
                tracing::warn!(
                    minutes = self.review.utc_offset_minutes,
                    "utc offset out of range, using UTC"
                );
                Utc.fix()
            });
        ReviewSchedule::new(
            self.review.first_interval_days,
            self.review.second_interval_days,
            offset,
        )
    }

    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            policy: self.reward_policy(),
            completion_reward: self.completion_reward(),
            review_reward: self.review_reward(),
            schedule: self.review_schedule(),
        }
    }
}
