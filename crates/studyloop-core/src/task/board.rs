//! Derived task groupings for display.
//!
//! Nothing here is persisted; everything is recomputed from the task list
//! and the current time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use super::Task;
use crate::error::ValidationError;
use crate::reward::RewardPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// Completed, delay elapsed, reward not collected.
    ReadyToCollect,
    /// Completed, still inside the reward delay.
    WaitingForReward,
    InProgress,
    /// Completion reward collected.
    Done,
}

impl TaskCategory {
    pub fn of(task: &Task, now: DateTime<Utc>, policy: &RewardPolicy) -> Self {
        match task.completed_at() {
            None => TaskCategory::InProgress,
            Some(_) if task.is_rewarded() => TaskCategory::Done,
            Some(completed_at) if policy.is_eligible(completed_at, now) => {
                TaskCategory::ReadyToCollect
            }
            Some(_) => TaskCategory::WaitingForReward,
        }
    }
}

/// Tasks grouped by category, each group most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskBoard {
    pub ready_to_collect: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub waiting_for_reward: Vec<Task>,
    pub done: Vec<Task>,
}

impl TaskBoard {
    pub fn build(
        tasks: impl IntoIterator<Item = Task>,
        now: DateTime<Utc>,
        policy: &RewardPolicy,
    ) -> Self {
        let mut board = TaskBoard::default();
        for task in tasks {
            match TaskCategory::of(&task, now, policy) {
                TaskCategory::ReadyToCollect => board.ready_to_collect.push(task),
                TaskCategory::WaitingForReward => board.waiting_for_reward.push(task),
                TaskCategory::InProgress => board.in_progress.push(task),
                TaskCategory::Done => board.done.push(task),
            }
        }

        board.ready_to_collect.sort_by_key(|t| Reverse(t.completed_at()));
        board.waiting_for_reward.sort_by_key(|t| Reverse(t.completed_at()));
        board.done.sort_by_key(|t| Reverse(t.completed_at()));
        board.in_progress.sort_by_key(|t| Reverse(t.created_at));
        board
    }

    /// Keep only tasks matching `filter` in every group.
    pub fn filtered(mut self, filter: TaskFilter, now: DateTime<Utc>) -> Self {
        for group in [
            &mut self.ready_to_collect,
            &mut self.in_progress,
            &mut self.waiting_for_reward,
            &mut self.done,
        ] {
            group.retain(|task| filter.matches(task, now));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.ready_to_collect.len()
            + self.in_progress.len()
            + self.waiting_for_reward.len()
            + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tasks whose review is actionable at `now`.
pub fn due_for_review(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| task.is_due_for_review(now))
        .collect()
}

/// Task list filter tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskFilter {
    #[default]
    All,
    Active,
    Completed,
    Review,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Active => !task.is_completed(),
            TaskFilter::Completed => task.is_completed(),
            TaskFilter::Review => task.is_due_for_review(now),
        }
    }
}

impl fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFilter::All => write!(f, "all"),
            TaskFilter::Active => write!(f, "active"),
            TaskFilter::Completed => write!(f, "completed"),
            TaskFilter::Review => write!(f, "review"),
        }
    }
}

impl FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "active" => Ok(TaskFilter::Active),
            "completed" => Ok(TaskFilter::Completed),
            "review" => Ok(TaskFilter::Review),
            other => Err(ValidationError::InvalidValue {
                field: "filter".to_string(),
                message: format!("unknown filter '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ReviewSchedule;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap()
    }

    fn fixture() -> Vec<Task> {
        let policy = RewardPolicy::default();
        let open_old = Task::new("Old open", "Math", false, t0());
        let open_new = Task::new("New open", "Math", false, t0() + Duration::hours(1));
        let ready = Task::new("Ready", "Math", true, t0())
            .complete(t0())
            .unwrap();
        let waiting = Task::new("Waiting", "Math", false, t0())
            .complete(t0() + Duration::hours(10))
            .unwrap();
        let done = Task::new("Done", "Math", true, t0() - Duration::days(10))
            .complete(t0() - Duration::days(10))
            .unwrap()
            .collect_reward(t0() - Duration::days(9), &policy, &ReviewSchedule::default())
            .unwrap();
        vec![open_old, ready, waiting, done, open_new]
    }

    #[test]
    fn categorize_follows_reward_state() {
        let policy = RewardPolicy::default();
        let now = t0() + Duration::hours(13);
        let categories: Vec<_> = fixture()
            .iter()
            .map(|t| TaskCategory::of(t, now, &policy))
            .collect();
        assert_eq!(
            categories,
            vec![
                TaskCategory::InProgress,
                TaskCategory::ReadyToCollect,
                TaskCategory::WaitingForReward,
                TaskCategory::Done,
                TaskCategory::InProgress,
            ]
        );
    }

    #[test]
    fn board_sorts_most_recent_first() {
        let board = TaskBoard::build(fixture(), t0() + Duration::hours(13), &RewardPolicy::default());
        let in_progress: Vec<_> = board.in_progress.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(in_progress, vec!["New open", "Old open"]);
        assert_eq!(board.ready_to_collect.len(), 1);
        assert_eq!(board.waiting_for_reward.len(), 1);
        assert_eq!(board.done.len(), 1);
        assert_eq!(board.len(), 5);
    }

    #[test]
    fn review_filter_only_keeps_due_reviews() {
        let now = t0() - Duration::days(5);
        let tasks = fixture();
        // First review of "Done" falls on 2024-03-02.
        assert!(due_for_review(&tasks, now).is_empty());

        let later = t0() + Duration::days(1);
        let due = due_for_review(&tasks, later);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].text, "Done");

        let board = TaskBoard::build(tasks, later, &RewardPolicy::default())
            .filtered(TaskFilter::Review, later);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn active_and_completed_filters_partition() {
        let now = t0() + Duration::hours(13);
        let tasks = fixture();
        let active = tasks.iter().filter(|t| TaskFilter::Active.matches(t, now)).count();
        let completed = tasks
            .iter()
            .filter(|t| TaskFilter::Completed.matches(t, now))
            .count();
        assert_eq!(active, 2);
        assert_eq!(completed, 3);
    }

    #[test]
    fn filter_parses_case_insensitively() {
        assert_eq!("Review".parse::<TaskFilter>().unwrap(), TaskFilter::Review);
        assert_eq!(TaskFilter::Active.to_string(), "active");
        assert!("later".parse::<TaskFilter>().is_err());
    }
}
