//! Experience to level mapping.
//!
//! Three tiers: level 1 up to 100 XP, level 2 up to 300 XP, level 3 beyond.
//! Level 3 is the cap and has no next-level target.

use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of level 1.
pub const LEVEL_ONE_CAP: u64 = 100;
/// Upper bound (inclusive) of level 2.
pub const LEVEL_TWO_CAP: u64 = 300;
/// Highest reachable level.
pub const MAX_LEVEL: u8 = 3;

pub fn level(experience: u64) -> u8 {
    if experience <= LEVEL_ONE_CAP {
        1
    } else if experience <= LEVEL_TWO_CAP {
        2
    } else {
        MAX_LEVEL
    }
}

/// Experience earned inside the current level.
pub fn progress_within_level(experience: u64) -> u64 {
    match level(experience) {
        1 => experience,
        2 => experience - LEVEL_ONE_CAP,
        _ => experience - LEVEL_TWO_CAP,
    }
}

pub fn experience_to_next_level(experience: u64) -> u64 {
    let progress = progress_within_level(experience);
    match level(experience) {
        1 => LEVEL_ONE_CAP - progress,
        2 => (LEVEL_TWO_CAP - LEVEL_ONE_CAP) - progress,
        _ => 0,
    }
}

/// Level summary shown on the subject progress view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub level: u8,
    pub progress: u64,
    pub experience_to_next_level: u64,
    pub total_experience: u64,
}

impl SubjectStats {
    pub fn from_experience(experience: u64) -> Self {
        Self {
            level: level(experience),
            progress: progress_within_level(experience),
            experience_to_next_level: experience_to_next_level(experience),
            total_experience: experience,
        }
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= MAX_LEVEL
    }

    /// Share of the current level completed, for a progress bar.
    pub fn level_percent(&self) -> f64 {
        if self.is_max_level() {
            return 100.0;
        }
        let span = self.progress + self.experience_to_next_level;
        if span == 0 {
            return 100.0;
        }
        self.progress as f64 / span as f64 * 100.0
    }
}
