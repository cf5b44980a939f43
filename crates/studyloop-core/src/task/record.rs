//! Flat persisted shape of a task.
//!
//! Storage keeps one column per field; review fields are absent (`None`) for
//! tasks created without review. Conversion into [`Task`] validates that the
//! flags describe a reachable lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ReviewCycle, ReviewStatus, Task, TaskStatus};
use crate::error::{DatabaseError, RecordKind};

/// Persisted review stage. `None` marks the terminal stage after the second
/// review reward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStage {
    None,
    First,
    Second,
}

impl ReviewStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStage::None => "none",
            ReviewStage::First => "first",
            ReviewStage::Second => "second",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(ReviewStage::None),
            "first" => Some(ReviewStage::First),
            "second" => Some(ReviewStage::Second),
            _ => None,
        }
    }
}

impl From<ReviewCycle> for ReviewStage {
    fn from(cycle: ReviewCycle) -> Self {
        match cycle {
            ReviewCycle::First => ReviewStage::First,
            ReviewCycle::Second => ReviewStage::Second,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub text: String,
    pub subject: String,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub rewarded: bool,
    pub requires_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_cycle: Option<ReviewStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_review_waiting: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_rewarded: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        let mut record = TaskRecord {
            id: task.id.clone(),
            text: task.text.clone(),
            subject: task.subject.clone(),
            completed: task.is_completed(),
            completed_at: task.completed_at(),
            rewarded: task.is_rewarded(),
            requires_review: task.requires_review(),
            review_cycle: None,
            next_review_date: None,
            review_completed_at: None,
            is_in_review_waiting: None,
            review_rewarded: None,
            created_at: task.created_at,
        };
        if task.requires_review() {
            record.review_cycle = Some(
                task.review_cycle()
                    .map(ReviewStage::from)
                    .unwrap_or(ReviewStage::None),
            );
            record.next_review_date = task.next_review_date();
            record.review_completed_at = task.review_completed_at();
            record.is_in_review_waiting = Some(task.is_in_review_waiting());
            record.review_rewarded = Some(task.review_rewarded());
        }
        record
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        TaskRecord::from(&task)
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = DatabaseError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let corrupt = |message: &str| DatabaseError::CorruptRecord {
            kind: RecordKind::Task,
            id: record.id.clone(),
            message: message.to_string(),
        };

        let has_review_fields = record.review_cycle.is_some()
            || record.next_review_date.is_some()
            || record.review_completed_at.is_some()
            || record.is_in_review_waiting.is_some()
            || record.review_rewarded.is_some();
        if !record.requires_review && has_review_fields {
            return Err(corrupt("review fields set on a task without review"));
        }

        let waiting = record.is_in_review_waiting.unwrap_or(false);
        let review_rewarded = record.review_rewarded.unwrap_or(false);

        let status = match (record.completed, record.completed_at, record.rewarded) {
            (false, None, false) => TaskStatus::Open,
            (true, Some(completed_at), false) => TaskStatus::Completed { completed_at },
            (true, Some(completed_at), true) => TaskStatus::Rewarded {
                completed_at,
                review: ReviewStatus::NotRequired,
            },
            _ => return Err(corrupt("completion flags are inconsistent")),
        };

        let status = match status {
            TaskStatus::Open | TaskStatus::Completed { .. } => {
                if record.requires_review {
                    let pristine = record.review_cycle == Some(ReviewStage::First)
                        && record.next_review_date.is_none()
                        && record.review_completed_at.is_none()
                        && !waiting
                        && !review_rewarded;
                    if !pristine {
                        return Err(corrupt("review progressed before the reward was collected"));
                    }
                }
                status
            }
            TaskStatus::Rewarded { completed_at, .. } if record.requires_review => {
                let review = review_status(&record, waiting, review_rewarded)
                    .map_err(|message| corrupt(message))?;
                TaskStatus::Rewarded {
                    completed_at,
                    review,
                }
            }
            TaskStatus::Rewarded { .. } => status,
        };

        let id = record.id.clone();
        Task::from_parts(
            record.id,
            record.text,
            record.subject,
            record.requires_review,
            status,
            record.created_at,
        )
        .ok_or_else(|| DatabaseError::CorruptRecord {
            kind: RecordKind::Task,
            id,
            message: "review status contradicts requiresReview".to_string(),
        })
    }
}

fn review_status(
    record: &TaskRecord,
    waiting: bool,
    review_rewarded: bool,
) -> Result<ReviewStatus, &'static str> {
    let cycle = match record.review_cycle {
        Some(ReviewStage::First) => Some(ReviewCycle::First),
        Some(ReviewStage::Second) => Some(ReviewCycle::Second),
        Some(ReviewStage::None) => None,
        None => return Err("missing review cycle"),
    };

    match (cycle, waiting) {
        (Some(cycle), true) => {
            let reviewed_at = record
                .review_completed_at
                .ok_or("waiting for a review reward without a review timestamp")?;
            if record.next_review_date.is_some() || review_rewarded {
                return Err("waiting review has a next date or is already rewarded");
            }
            Ok(ReviewStatus::InWaiting { cycle, reviewed_at })
        }
        (Some(cycle), false) => {
            let due_at = record
                .next_review_date
                .ok_or("scheduled review has no next review date")?;
            if record.review_completed_at.is_some() != review_rewarded {
                return Err("previous review timestamp and reward flag disagree");
            }
            Ok(ReviewStatus::Scheduled {
                cycle,
                due_at,
                last_reviewed_at: record.review_completed_at,
            })
        }
        (None, false) => {
            let last_reviewed_at = record
                .review_completed_at
                .ok_or("finished reviews without a review timestamp")?;
            if record.next_review_date.is_some() || !review_rewarded {
                return Err("finished reviews still scheduled or unrewarded");
            }
            Ok(ReviewStatus::Finished { last_reviewed_at })
        }
        (None, true) => Err("finished reviews cannot be waiting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::RewardPolicy;
    use crate::task::ReviewSchedule;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap()
    }

    fn roundtrip(task: &Task) -> Task {
        Task::try_from(TaskRecord::from(task)).unwrap()
    }

    #[test]
    fn plain_task_has_no_review_fields() {
        let task = Task::new("Flashcards", "Biology", false, t0());
        let record = TaskRecord::from(&task);
        assert!(record.review_cycle.is_none());
        assert!(record.is_in_review_waiting.is_none());
        assert!(record.review_rewarded.is_none());

        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("reviewCycle"));
        assert!(!obj.contains_key("nextReviewDate"));
        assert!(obj.contains_key("completedAt"));
        assert_eq!(obj["requiresReview"], serde_json::Value::Bool(false));
    }

    #[test]
    fn every_reachable_state_survives_projection() {
        let policy = RewardPolicy::default();
        let schedule = ReviewSchedule::default();
        let open = Task::new("Read chapter 3", "Math", true, t0());
        let completed = open.complete(t0()).unwrap();
        let rewarded = completed
            .collect_reward(t0() + Duration::hours(12), &policy, &schedule)
            .unwrap();
        let due = rewarded.next_review_date().unwrap();
        let (waiting, _) = rewarded.mark_review_done(due).unwrap();
        let (second, _) = waiting
            .collect_review_reward(due + Duration::hours(12), &policy, &schedule)
            .unwrap();
        let second_due = second.next_review_date().unwrap();
        let (finished, _) = second
            .mark_review_done(second_due)
            .unwrap()
            .0
            .collect_review_reward(second_due + Duration::hours(12), &policy, &schedule)
            .unwrap();

        for task in [&open, &completed, &rewarded, &waiting, &second, &finished] {
            assert_eq!(&roundtrip(task), task);
        }

        let record = TaskRecord::from(&finished);
        assert_eq!(record.review_cycle, Some(ReviewStage::None));
        assert_eq!(record.review_rewarded, Some(true));
        assert!(record.next_review_date.is_none());
    }

    #[test]
    fn rejects_rewarded_without_completion() {
        let mut record = TaskRecord::from(&Task::new("Read", "Math", false, t0()));
        record.rewarded = true;
        let err = Task::try_from(record).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRecord { .. }));
    }

    #[test]
    fn rejects_completed_without_timestamp() {
        let mut record = TaskRecord::from(&Task::new("Read", "Math", false, t0()));
        record.completed = true;
        assert!(Task::try_from(record).is_err());
    }

    #[test]
    fn rejects_review_fields_without_review() {
        let mut record = TaskRecord::from(&Task::new("Read", "Math", false, t0()));
        record.next_review_date = Some(t0());
        assert!(Task::try_from(record).is_err());
    }

    #[test]
    fn rejects_waiting_without_timestamp() {
        let policy = RewardPolicy::default();
        let rewarded = Task::new("Read", "Math", true, t0())
            .complete(t0())
            .unwrap()
            .collect_reward(t0() + Duration::hours(12), &policy, &ReviewSchedule::default())
            .unwrap();
        let mut record = TaskRecord::from(&rewarded);
        record.is_in_review_waiting = Some(true);
        record.next_review_date = None;
        assert!(Task::try_from(record).is_err());
    }

    #[test]
    fn review_stage_parse_roundtrip() {
        for stage in [ReviewStage::None, ReviewStage::First, ReviewStage::Second] {
            assert_eq!(ReviewStage::parse(stage.as_str()), Some(stage));
        }
        assert!(ReviewStage::parse("third").is_none());
    }
}
