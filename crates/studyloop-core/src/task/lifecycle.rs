//! Task lifecycle service.
//!
//! `TaskLifecycle` loads tasks from a [`Store`], applies the pure transitions
//! defined on [`Task`] and commits the result. Reward transitions write the
//! task, the subject and the wallet in a single [`WriteBatch`], so a failed
//! commit leaves all three untouched and the call can simply be retried.
//!
//! Transitions whose preconditions do not hold return `Ok(None)` and change
//! nothing. Errors are reserved for bad input, unknown ids and storage
//! failures.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::board::{self, TaskBoard, TaskFilter};
use super::{
    BlockedReason, LifecycleAction, ReviewCycle, ReviewSchedule, ReviewStatus, Task, TaskStatus,
    TransitionError,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{ConfigError, CoreError, Result, ValidationError};
use crate::events::Event;
use crate::reward::{RewardAmounts, RewardPolicy, TimeRemaining};
use crate::storage::{Store, WriteBatch};
use crate::subject::{Subject, SubjectLedger};
use crate::task::record::TaskRecord;
use crate::wallet::UserWallet;

/// Input for [`TaskLifecycle::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub subject: String,
    pub requires_review: bool,
}

impl NewTask {
    pub fn new(text: impl Into<String>, subject: impl Into<String>, requires_review: bool) -> Self {
        Self {
            text: text.into(),
            subject: subject.into(),
            requires_review,
        }
    }
}

/// Editable, non-lifecycle fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub subject: Option<String>,
}

/// Tunables the lifecycle reads on every transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleSettings {
    pub policy: RewardPolicy,
    pub completion_reward: RewardAmounts,
    pub review_reward: RewardAmounts,
    pub schedule: ReviewSchedule,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            policy: RewardPolicy::default(),
            completion_reward: RewardAmounts::COMPLETION,
            review_reward: RewardAmounts::REVIEW,
            schedule: ReviewSchedule::default(),
        }
    }
}

/// Result of a committed reward collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    pub task: Task,
    /// Subject after the experience was credited.
    pub subject: Subject,
    pub coins: u64,
    pub experience: u64,
    /// Wallet balance after the coins were credited.
    pub balance: u64,
    /// Review round that was rewarded; `None` for the completion reward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_cycle: Option<ReviewCycle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReward {
    Completion,
    Review,
}

/// Countdown for whichever reward a task is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardProgress {
    pub kind: PendingReward,
    pub since: DateTime<Utc>,
    pub percent: f64,
    pub remaining: TimeRemaining,
}

/// Task command and query service over a [`Store`].
///
/// Every committed command appends to an in-memory event log. The log is
/// only emptied by [`TaskLifecycle::drain_events`], so long-lived callers
/// must drain it after each command they issue.
pub struct TaskLifecycle<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    settings: LifecycleSettings,
    events: Vec<Event>,
}

impl<S: Store> TaskLifecycle<S, SystemClock> {
    /// Lifecycle on the system clock with default settings.
    pub fn open(store: S) -> Self {
        Self::new(store, SystemClock)
    }
}

impl<S: Store, C: Clock> TaskLifecycle<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_settings(store, clock, LifecycleSettings::default())
    }

    pub fn with_settings(store: S, clock: C, settings: LifecycleSettings) -> Self {
        Self {
            store,
            clock,
            settings,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn subjects(&self) -> SubjectLedger<'_, S> {
        SubjectLedger::new(&self.store)
    }

    pub fn wallet(&self) -> UserWallet<'_, S> {
        UserWallet::new(&self.store)
    }

    /// Events recorded since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// All tasks, oldest first.
    pub fn tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self
            .store
            .list_tasks()?
            .into_iter()
            .map(Task::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    pub fn task(&self, id: &str) -> Result<Task> {
        let record = self
            .store
            .get_task(id)?
            .ok_or_else(|| CoreError::task_not_found(id))?;
        Ok(Task::try_from(record)?)
    }

    pub fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let now = self.clock.now();
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|task| filter.matches(task, now))
            .collect())
    }

    /// Tasks whose review can be marked done now.
    pub fn due_for_review(&self) -> Result<Vec<Task>> {
        let tasks = self.tasks()?;
        Ok(board::due_for_review(&tasks, self.clock.now())
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn board(&self) -> Result<TaskBoard> {
        Ok(TaskBoard::build(
            self.tasks()?,
            self.clock.now(),
            &self.settings.policy,
        ))
    }

    /// Countdown for the task's pending reward, if any. Pure read.
    pub fn reward_progress(&self, task: &Task) -> Option<RewardProgress> {
        let (kind, since) = match task.status() {
            TaskStatus::Completed { completed_at } => (PendingReward::Completion, completed_at),
            TaskStatus::Rewarded {
                review: ReviewStatus::InWaiting { reviewed_at, .. },
                ..
            } => (PendingReward::Review, reviewed_at),
            _ => return None,
        };
        let now = self.clock.now();
        let policy = &self.settings.policy;
        Some(RewardProgress {
            kind,
            since,
            percent: policy.progress(Some(since), now),
            remaining: policy.remaining(Some(since), now)?,
        })
    }

    pub fn available_actions(&self, task: &Task) -> Vec<LifecycleAction> {
        task.available_actions(self.clock.now(), &self.settings.policy)
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Create an open task under an existing subject.
    pub fn create(&mut self, input: NewTask) -> Result<Task> {
        let text = validate_text(&input.text)?;
        let subject = self.known_subject(&input.subject)?;

        let task = Task::new(text, subject, input.requires_review, self.clock.now());
        self.store
            .commit(WriteBatch::new().insert_task(TaskRecord::from(&task)))?;

        tracing::info!(task_id = %task.id, subject = %task.subject, "task created");
        self.events.push(Event::TaskCreated {
            task_id: task.id.clone(),
            subject: task.subject.clone(),
            requires_review: task.requires_review(),
            at: task.created_at,
        });
        Ok(task)
    }

    pub fn complete(&mut self, id: &str) -> Result<Option<Task>> {
        let now = self.clock.now();
        let task = self.task(id)?;
        let updated = match task.complete(now) {
            Ok(updated) => updated,
            Err(blocked) => return refused(id, blocked),
        };

        self.store
            .commit(WriteBatch::new().upsert_task(TaskRecord::from(&updated)))?;
        tracing::info!(task_id = %id, "task completed");
        self.events.push(Event::TaskCompleted {
            task_id: updated.id.clone(),
            at: now,
        });
        Ok(Some(updated))
    }

    /// Collect the completion reward once the delay has elapsed.
    pub fn collect_reward(&mut self, id: &str) -> Result<Option<RewardOutcome>> {
        let now = self.clock.now();
        let task = self.task(id)?;
        let updated = match task.collect_reward(now, &self.settings.policy, &self.settings.schedule)
        {
            Ok(updated) => updated,
            Err(blocked) => return refused(id, blocked),
        };

        let outcome = self.grant(updated, self.settings.completion_reward, None)?;
        self.events.push(Event::RewardCollected {
            task_id: outcome.task.id.clone(),
            subject: outcome.subject.name.clone(),
            coins: outcome.coins,
            experience: outcome.experience,
            at: now,
        });
        Ok(Some(outcome))
    }

    /// Record that the due review was done.
    pub fn mark_review_done(&mut self, id: &str) -> Result<Option<Task>> {
        let now = self.clock.now();
        let task = self.task(id)?;
        let (updated, cycle) = match task.mark_review_done(now) {
            Ok(result) => result,
            Err(blocked) => return refused(id, blocked),
        };

        self.store
            .commit(WriteBatch::new().upsert_task(TaskRecord::from(&updated)))?;
        tracing::info!(task_id = %id, %cycle, "review marked done");
        self.events.push(Event::ReviewMarkedDone {
            task_id: updated.id.clone(),
            cycle,
            at: now,
        });
        Ok(Some(updated))
    }

    /// Collect the reward for a review in waiting.
    pub fn collect_review_reward(&mut self, id: &str) -> Result<Option<RewardOutcome>> {
        let now = self.clock.now();
        let task = self.task(id)?;
        let (updated, cycle) =
            match task.collect_review_reward(now, &self.settings.policy, &self.settings.schedule) {
                Ok(result) => result,
                Err(blocked) => return refused(id, blocked),
            };

        let outcome = self.grant(updated, self.settings.review_reward, Some(cycle))?;
        self.events.push(Event::ReviewRewardCollected {
            task_id: outcome.task.id.clone(),
            subject: outcome.subject.name.clone(),
            cycle,
            coins: outcome.coins,
            experience: outcome.experience,
            at: now,
        });
        Ok(Some(outcome))
    }

    /// Change text and/or subject. Lifecycle state is untouched.
    pub fn edit(&mut self, id: &str, edit: TaskEdit) -> Result<Task> {
        let mut task = self.task(id)?;
        if let Some(text) = edit.text.as_deref() {
            task.text = validate_text(text)?.to_string();
        }
        if let Some(subject) = edit.subject.as_deref() {
            task.subject = self.known_subject(subject)?;
        }

        self.store
            .commit(WriteBatch::new().upsert_task(TaskRecord::from(&task)))?;
        tracing::info!(task_id = %id, "task edited");
        self.events.push(Event::TaskEdited {
            task_id: task.id.clone(),
            at: self.clock.now(),
        });
        Ok(task)
    }

    /// Remove a task. Rewards already granted stay granted.
    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let task = self.task(id)?;
        self.store
            .commit(WriteBatch::new().remove_task(task.id.clone()))?;
        tracing::info!(task_id = %id, "task deleted");
        self.events.push(Event::TaskDeleted {
            task_id: task.id.clone(),
            at: self.clock.now(),
        });
        Ok(task)
    }

    pub fn add_subject(&mut self, name: &str) -> Result<Subject> {
        let subject = self.subjects().add(name, self.clock.now())?;
        self.events.push(Event::SubjectAdded {
            name: subject.name.clone(),
            at: subject.created_at,
        });
        Ok(subject)
    }

    pub fn remove_subject(&mut self, name: &str) -> Result<Subject> {
        let subject = self.subjects().remove(name)?;
        self.events.push(Event::SubjectRemoved {
            name: subject.name.clone(),
            at: self.clock.now(),
        });
        Ok(subject)
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Commit the transitioned task together with its coin and experience
    /// credit.
    fn grant(
        &self,
        task: Task,
        amounts: RewardAmounts,
        review_cycle: Option<ReviewCycle>,
    ) -> Result<RewardOutcome> {
        let subject = self.subjects().require(&task.subject)?.credited(amounts.experience);
        let profile = self
            .store
            .get_profile()?
            .unwrap_or_default()
            .credited(amounts.coins);

        let batch = WriteBatch::new()
            .upsert_task(TaskRecord::from(&task))
            .upsert_subject(subject.clone())
            .upsert_profile(profile.clone());
        self.store.commit(batch)?;

        tracing::info!(
            task_id = %task.id,
            subject = %subject.name,
            coins = amounts.coins,
            experience = amounts.experience,
            review_cycle = ?review_cycle,
            "reward collected"
        );
        Ok(RewardOutcome {
            task,
            subject,
            coins: amounts.coins,
            experience: amounts.experience,
            balance: profile.coins,
            review_cycle,
        })
    }

    fn known_subject(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if self.subjects().exists(name)? {
            Ok(name.to_string())
        } else {
            Err(ValidationError::UnknownSubject(name.to_string()).into())
        }
    }
}

fn validate_text(text: &str) -> Result<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText.into());
    }
    Ok(text)
}

/// A refused transition is a no-op, unless the configured review interval
/// pushed the next review date out of range.
fn refused<T>(id: &str, blocked: TransitionError) -> Result<Option<T>> {
    if blocked.reason == BlockedReason::ReviewDateOutOfRange {
        let key = match blocked.action {
            LifecycleAction::CollectReviewReward => "review.second_interval_days",
            _ => "review.first_interval_days",
        };
        tracing::warn!(task_id = %id, key, "review interval overflows the calendar");
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: blocked.reason.to_string(),
        }
        .into());
    }
    tracing::debug!(task_id = %id, reason = %blocked, "transition skipped");
    Ok(None)
}
