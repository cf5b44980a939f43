//! Study task model and its lifecycle transitions.
//!
//! A task moves through three primary states, with a review sub-state once the
//! completion reward is collected on tasks that require review:
//!
//! ```text
//!   OPEN ──complete──> COMPLETED ──collect reward──> REWARDED
//!                       (12h wait)                      │
//!                                                       │ requires review
//!                                                       v
//!        SCHEDULED(first) ──review──> IN_WAITING(first) ──collect──> SCHEDULED(second)
//!                                     (12h wait)                          │ review
//!                                                                         v
//!        FINISHED <──────────────collect─────────────── IN_WAITING(second)
//! ```
//!
//! Transitions here are pure: they take `now` and return an updated copy, so
//! the caller can persist first and only then treat the change as applied.

pub mod board;
pub mod lifecycle;
pub mod record;
pub mod review;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reward::RewardPolicy;
pub use review::ReviewSchedule;

/// Review round a task is currently in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewCycle {
    First,
    Second,
}

impl fmt::Display for ReviewCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewCycle::First => write!(f, "first"),
            ReviewCycle::Second => write!(f, "second"),
        }
    }
}

/// Review progress of a rewarded task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    /// Task was created without review.
    NotRequired,
    /// Next review date is set; actionable once `due_at <= now`.
    Scheduled {
        cycle: ReviewCycle,
        due_at: DateTime<Utc>,
        /// When the previous review was marked done (second cycle only).
        last_reviewed_at: Option<DateTime<Utc>>,
    },
    /// Review marked done, waiting for its reward delay.
    InWaiting {
        cycle: ReviewCycle,
        reviewed_at: DateTime<Utc>,
    },
    /// Both review rewards collected. Terminal.
    Finished { last_reviewed_at: DateTime<Utc> },
}

/// Primary lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Completed {
        completed_at: DateTime<Utc>,
    },
    Rewarded {
        completed_at: DateTime<Utc>,
        review: ReviewStatus,
    },
}

/// A unit of study work.
///
/// Serializes through its flat [`record::TaskRecord`] shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "record::TaskRecord", try_from = "record::TaskRecord")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub subject: String,
    requires_review: bool,
    status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create an open task.
    pub fn new(
        text: impl Into<String>,
        subject: impl Into<String>,
        requires_review: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            text: text.into(),
            subject: subject.into(),
            requires_review,
            status: TaskStatus::Open,
            created_at: now,
        }
    }

    /// Rebuild a task from already-validated parts.
    ///
    /// Returns `None` when `status` contradicts `requires_review`.
    pub(crate) fn from_parts(
        id: String,
        text: String,
        subject: String,
        requires_review: bool,
        status: TaskStatus,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        if let TaskStatus::Rewarded { review, .. } = status {
            let review_required = review != ReviewStatus::NotRequired;
            if review_required != requires_review {
                return None;
            }
        }
        Some(Task {
            id,
            text,
            subject,
            requires_review,
            status,
            created_at,
        })
    }

    pub fn requires_review(&self) -> bool {
        self.requires_review
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        !matches!(self.status, TaskStatus::Open)
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            TaskStatus::Open => None,
            TaskStatus::Completed { completed_at } | TaskStatus::Rewarded { completed_at, .. } => {
                Some(completed_at)
            }
        }
    }

    pub fn is_rewarded(&self) -> bool {
        matches!(self.status, TaskStatus::Rewarded { .. })
    }

    /// Review sub-state, or `None` until the completion reward is collected.
    pub fn review(&self) -> Option<ReviewStatus> {
        match self.status {
            TaskStatus::Rewarded { review, .. } => Some(review),
            _ => None,
        }
    }

    /// Pending review round; `None` once reviews are finished or not required.
    pub fn review_cycle(&self) -> Option<ReviewCycle> {
        if !self.requires_review {
            return None;
        }
        match self.review() {
            None => Some(ReviewCycle::First),
            Some(ReviewStatus::Scheduled { cycle, .. } | ReviewStatus::InWaiting { cycle, .. }) => {
                Some(cycle)
            }
            Some(ReviewStatus::NotRequired | ReviewStatus::Finished { .. }) => None,
        }
    }

    pub fn next_review_date(&self) -> Option<DateTime<Utc>> {
        match self.review() {
            Some(ReviewStatus::Scheduled { due_at, .. }) => Some(due_at),
            _ => None,
        }
    }

    pub fn review_completed_at(&self) -> Option<DateTime<Utc>> {
        match self.review() {
            Some(ReviewStatus::Scheduled {
                last_reviewed_at, ..
            }) => last_reviewed_at,
            Some(ReviewStatus::InWaiting { reviewed_at, .. }) => Some(reviewed_at),
            Some(ReviewStatus::Finished { last_reviewed_at }) => Some(last_reviewed_at),
            _ => None,
        }
    }

    pub fn is_in_review_waiting(&self) -> bool {
        matches!(self.review(), Some(ReviewStatus::InWaiting { .. }))
    }

    /// Whether the most recent review's reward has been collected.
    pub fn review_rewarded(&self) -> bool {
        match self.review() {
            Some(ReviewStatus::Scheduled {
                last_reviewed_at, ..
            }) => last_reviewed_at.is_some(),
            Some(ReviewStatus::Finished { .. }) => true,
            _ => false,
        }
    }

    pub fn reviews_finished(&self) -> bool {
        matches!(self.review(), Some(ReviewStatus::Finished { .. }))
    }

    /// Review is actionable: scheduled and due.
    pub fn is_due_for_review(&self, now: DateTime<Utc>) -> bool {
        self.requires_review
            && !self.is_in_review_waiting()
            && self.next_review_date().is_some_and(|due| due <= now)
    }

    /// Mark the task done. Only valid from OPEN.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<Task, TransitionError> {
        match self.status {
            TaskStatus::Open => Ok(self.with_status(TaskStatus::Completed { completed_at: now })),
            _ => Err(TransitionError::new(
                LifecycleAction::Complete,
                BlockedReason::AlreadyCompleted,
            )),
        }
    }

    /// Collect the completion reward once the delay has passed.
    ///
    /// Review-required tasks get their first review scheduled at the start of
    /// the day one interval ahead.
    pub fn collect_reward(
        &self,
        now: DateTime<Utc>,
        policy: &RewardPolicy,
        schedule: &ReviewSchedule,
    ) -> Result<Task, TransitionError> {
        let blocked = |reason| TransitionError::new(LifecycleAction::CollectReward, reason);
        let completed_at = match self.status {
            TaskStatus::Open => return Err(blocked(BlockedReason::NotCompleted)),
            TaskStatus::Rewarded { .. } => return Err(blocked(BlockedReason::AlreadyRewarded)),
            TaskStatus::Completed { completed_at } => completed_at,
        };
        if !policy.is_eligible(completed_at, now) {
            return Err(blocked(BlockedReason::RewardNotReady));
        }

        let review = if self.requires_review {
            ReviewStatus::Scheduled {
                cycle: ReviewCycle::First,
                due_at: schedule
                    .next_review_at(now, ReviewCycle::First)
                    .ok_or_else(|| blocked(BlockedReason::ReviewDateOutOfRange))?,
                last_reviewed_at: None,
            }
        } else {
            ReviewStatus::NotRequired
        };
        Ok(self.with_status(TaskStatus::Rewarded {
            completed_at,
            review,
        }))
    }

    /// Record that the due review was done, starting its reward delay.
    /// Returns the updated task and the cycle that was reviewed.
    pub fn mark_review_done(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(Task, ReviewCycle), TransitionError> {
        let blocked = |reason| TransitionError::new(LifecycleAction::MarkReviewDone, reason);
        if !self.requires_review {
            return Err(blocked(BlockedReason::ReviewNotRequired));
        }
        let TaskStatus::Rewarded {
            completed_at,
            review,
        } = self.status
        else {
            return Err(blocked(BlockedReason::ReviewNotDue));
        };

        match review {
            ReviewStatus::Scheduled { cycle, due_at, .. } if due_at <= now => {
                let task = self.with_status(TaskStatus::Rewarded {
                    completed_at,
                    review: ReviewStatus::InWaiting {
                        cycle,
                        reviewed_at: now,
                    },
                });
                Ok((task, cycle))
            }
            ReviewStatus::Scheduled { .. } => Err(blocked(BlockedReason::ReviewNotDue)),
            ReviewStatus::InWaiting { .. } => Err(blocked(BlockedReason::ReviewAlreadyInWaiting)),
            ReviewStatus::Finished { .. } => Err(blocked(BlockedReason::ReviewsFinished)),
            ReviewStatus::NotRequired => Err(blocked(BlockedReason::ReviewNotRequired)),
        }
    }

    /// Collect the reward for a finished review.
    ///
    /// The first cycle schedules the second; the second cycle is terminal.
    /// Returns the updated task and the cycle that was rewarded.
    pub fn collect_review_reward(
        &self,
        now: DateTime<Utc>,
        policy: &RewardPolicy,
        schedule: &ReviewSchedule,
    ) -> Result<(Task, ReviewCycle), TransitionError> {
        let blocked = |reason| TransitionError::new(LifecycleAction::CollectReviewReward, reason);
        let TaskStatus::Rewarded {
            completed_at,
            review: ReviewStatus::InWaiting { cycle, reviewed_at },
        } = self.status
        else {
            return Err(blocked(BlockedReason::NoReviewInWaiting));
        };
        if !policy.is_eligible(reviewed_at, now) {
            return Err(blocked(BlockedReason::RewardNotReady));
        }

        let review = match cycle {
            ReviewCycle::First => ReviewStatus::Scheduled {
                cycle: ReviewCycle::Second,
                due_at: schedule
                    .next_review_at(now, ReviewCycle::Second)
                    .ok_or_else(|| blocked(BlockedReason::ReviewDateOutOfRange))?,
                last_reviewed_at: Some(reviewed_at),
            },
            ReviewCycle::Second => ReviewStatus::Finished {
                last_reviewed_at: reviewed_at,
            },
        };
        let task = self.with_status(TaskStatus::Rewarded {
            completed_at,
            review,
        });
        Ok((task, cycle))
    }

    /// Lifecycle actions that would succeed at `now`.
    pub fn available_actions(&self, now: DateTime<Utc>, policy: &RewardPolicy) -> Vec<LifecycleAction> {
        match self.status {
            TaskStatus::Open => vec![LifecycleAction::Complete],
            TaskStatus::Completed { completed_at } if policy.is_eligible(completed_at, now) => {
                vec![LifecycleAction::CollectReward]
            }
            TaskStatus::Completed { .. } => vec![],
            TaskStatus::Rewarded { review, .. } => match review {
                ReviewStatus::Scheduled { due_at, .. } if due_at <= now => {
                    vec![LifecycleAction::MarkReviewDone]
                }
                ReviewStatus::InWaiting { reviewed_at, .. }
                    if policy.is_eligible(reviewed_at, now) =>
                {
                    vec![LifecycleAction::CollectReviewReward]
                }
                _ => vec![],
            },
        }
    }

    fn with_status(&self, status: TaskStatus) -> Task {
        Task {
            status,
            ..self.clone()
        }
    }
}

/// User-facing lifecycle operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Complete,
    CollectReward,
    MarkReviewDone,
    CollectReviewReward,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Complete => write!(f, "complete"),
            LifecycleAction::CollectReward => write!(f, "collect"),
            LifecycleAction::MarkReviewDone => write!(f, "review"),
            LifecycleAction::CollectReviewReward => write!(f, "collect-review"),
        }
    }
}

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockedReason {
    AlreadyCompleted,
    NotCompleted,
    AlreadyRewarded,
    RewardNotReady,
    ReviewNotRequired,
    ReviewNotDue,
    ReviewAlreadyInWaiting,
    NoReviewInWaiting,
    ReviewsFinished,
    ReviewDateOutOfRange,
}

impl fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BlockedReason::AlreadyCompleted => "task is already completed",
            BlockedReason::NotCompleted => "task is not completed",
            BlockedReason::AlreadyRewarded => "reward already collected",
            BlockedReason::RewardNotReady => "reward delay has not elapsed",
            BlockedReason::ReviewNotRequired => "task does not require review",
            BlockedReason::ReviewNotDue => "no review is due",
            BlockedReason::ReviewAlreadyInWaiting => "review already marked done",
            BlockedReason::NoReviewInWaiting => "no review reward is pending",
            BlockedReason::ReviewsFinished => "all reviews are finished",
            BlockedReason::ReviewDateOutOfRange => "next review date is out of range",
        };
        f.write_str(text)
    }
}

/// Error returned when a transition's preconditions are not met.
///
/// The lifecycle service turns this into a no-op result, except for
/// [`BlockedReason::ReviewDateOutOfRange`], which it reports as a config
/// error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionError {
    pub action: LifecycleAction,
    pub reason: BlockedReason,
}

impl TransitionError {
    pub fn new(action: LifecycleAction, reason: BlockedReason) -> Self {
        Self { action, reason }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {}: {}", self.action, self.reason)
    }
}

impl std::error::Error for TransitionError {}
