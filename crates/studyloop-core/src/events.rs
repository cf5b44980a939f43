use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::ReviewCycle;

/// Every committed change produces an Event.
/// The presentation layer drains them to show reward notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TaskCreated {
        task_id: String,
        subject: String,
        requires_review: bool,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        at: DateTime<Utc>,
    },
    /// Completion reward credited to the wallet and subject.
    RewardCollected {
        task_id: String,
        subject: String,
        coins: u64,
        experience: u64,
        at: DateTime<Utc>,
    },
    ReviewMarkedDone {
        task_id: String,
        cycle: ReviewCycle,
        at: DateTime<Utc>,
    },
    ReviewRewardCollected {
        task_id: String,
        subject: String,
        cycle: ReviewCycle,
        coins: u64,
        experience: u64,
        at: DateTime<Utc>,
    },
    TaskEdited {
        task_id: String,
        at: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: String,
        at: DateTime<Utc>,
    },
    SubjectAdded {
        name: String,
        at: DateTime<Utc>,
    },
    SubjectRemoved {
        name: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Coins and experience granted by this event, if it is a reward.
    pub fn reward(&self) -> Option<(u64, u64)> {
        match self {
            Event::RewardCollected {
                coins, experience, ..
            }
            | Event::ReviewRewardCollected {
                coins, experience, ..
            } => Some((*coins, *experience)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::ReviewMarkedDone {
            task_id: "task-1".into(),
            cycle: ReviewCycle::Second,
            at: Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReviewMarkedDone");
        assert_eq!(json["cycle"], "second");
    }

    #[test]
    fn reward_only_for_reward_events() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap();
        let collected = Event::RewardCollected {
            task_id: "task-1".into(),
            subject: "Math".into(),
            coins: 5,
            experience: 5,
            at,
        };
        assert_eq!(collected.reward(), Some((5, 5)));
        assert_eq!(
            Event::TaskCompleted {
                task_id: "task-1".into(),
                at
            }
            .reward(),
            None
        );
    }
}
