//! Delayed reward timing.
//!
//! Rewards unlock a fixed delay after the reference instant (task completion
//! or review completion). All functions here are pure: callers pass `now`
//! explicitly, which also makes display polling a side-effect-free recompute.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default wait before any reward can be collected (12 hours).
pub const DEFAULT_REWARD_DELAY_SECS: u64 = 43_200;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Reward delay policy shared by completion and review rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    delay_secs: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REWARD_DELAY_SECS)
    }
}

impl RewardPolicy {
    pub fn new(delay_secs: u64) -> Self {
        Self { delay_secs }
    }

    pub fn delay_secs(&self) -> u64 {
        self.delay_secs
    }

    fn delay_ms(&self) -> i64 {
        i64::try_from(self.delay_secs)
            .unwrap_or(i64::MAX / MS_PER_SECOND)
            .saturating_mul(MS_PER_SECOND)
    }

    /// Percentage of the delay that has elapsed, clamped to `[0, 100]`.
    ///
    /// Returns 0 when there is no reference instant.
    pub fn progress(&self, reference: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(reference) = reference else {
            return 0.0;
        };
        let delay_ms = self.delay_ms();
        if delay_ms == 0 {
            return 100.0;
        }
        let elapsed = elapsed_ms(reference, now) as f64;
        (elapsed / delay_ms as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Time left until the reward unlocks, or `None` without a reference.
    pub fn remaining(
        &self,
        reference: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<TimeRemaining> {
        let reference = reference?;
        let remaining_ms = self.delay_ms() - elapsed_ms(reference, now);
        Some(TimeRemaining::from_millis(remaining_ms))
    }

    /// Whether at least the full delay has passed since `reference`.
    pub fn is_eligible(&self, reference: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        elapsed_ms(reference, now) >= self.delay_ms()
    }
}

/// Coins and experience granted by one reward collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAmounts {
    pub coins: u64,
    pub experience: u64,
}

impl RewardAmounts {
    pub const COMPLETION: RewardAmounts = RewardAmounts {
        coins: 5,
        experience: 5,
    };
    pub const REVIEW: RewardAmounts = RewardAmounts {
        coins: 10,
        experience: 10,
    };

    pub fn new(coins: u64, experience: u64) -> Self {
        Self { coins, experience }
    }
}

fn elapsed_ms(reference: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(reference).num_milliseconds()
}

/// Countdown broken out for display.
///
/// Only the two most significant units are kept: hours and minutes when at
/// least an hour remains, minutes and seconds when at least a minute remains,
/// otherwise seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeRemaining {
    Ready,
    Hours { hours: u64, minutes: u64 },
    Minutes { minutes: u64, seconds: u64 },
    Seconds { seconds: u64 },
}

impl TimeRemaining {
    fn from_millis(remaining_ms: i64) -> Self {
        if remaining_ms <= 0 {
            return TimeRemaining::Ready;
        }
        let hours = (remaining_ms / MS_PER_HOUR) as u64;
        let minutes = ((remaining_ms % MS_PER_HOUR) / MS_PER_MINUTE) as u64;
        let seconds = ((remaining_ms % MS_PER_MINUTE) / MS_PER_SECOND) as u64;

        if hours > 0 {
            TimeRemaining::Hours { hours, minutes }
        } else if minutes > 0 {
            TimeRemaining::Minutes { minutes, seconds }
        } else {
            TimeRemaining::Seconds { seconds }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TimeRemaining::Ready)
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRemaining::Ready => write!(f, "Ready to collect!"),
            TimeRemaining::Hours { hours, minutes } => {
                write!(f, "{hours}h {minutes}m remaining")
            }
            TimeRemaining::Minutes { minutes, seconds } => {
                write!(f, "{minutes}m {seconds}s remaining")
            }
            TimeRemaining::Seconds { seconds } => write!(f, "{seconds}s remaining"),
        }
    }
}
