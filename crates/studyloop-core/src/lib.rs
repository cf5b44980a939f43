//! # Studyloop Core Library
//!
//! This library provides the core business logic for Studyloop, a study task
//! tracker with delayed rewards and spaced review. Every operation is
//! available through the `studyloop` CLI, which is a thin layer over this
//! crate.
//!
//! ## Architecture
//!
//! - **Task lifecycle**: pure transitions on [`Task`] driven by
//!   [`TaskLifecycle`], which persists each change through a [`Store`]
//! - **Rewards**: a fixed delay between finishing work and collecting coins
//!   and subject experience, see [`RewardPolicy`]
//! - **Review**: two spaced reviews (7 and 30 days by default), each with its
//!   own delayed reward
//! - **Storage**: SQLite persistence with atomic write batches and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`TaskLifecycle`]: command/query service over tasks, subjects and wallet
//! - [`SqliteStore`]: on-disk persistence
//! - [`Config`]: application configuration management
//! - [`Clock`]: time source, swappable for tests

pub mod clock;
pub mod error;
pub mod events;
pub mod level;
pub mod reward;
pub mod storage;
pub mod subject;
pub mod task;
pub mod wallet;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, RecordKind, ValidationError};
pub use events::Event;
pub use level::SubjectStats;
pub use reward::{RewardAmounts, RewardPolicy, TimeRemaining};
pub use storage::{Config, MemoryStore, SqliteStore, Store, WriteBatch};
pub use subject::{Subject, SubjectLedger};
pub use task::board::{TaskBoard, TaskCategory, TaskFilter};
pub use task::lifecycle::{
    LifecycleSettings, NewTask, PendingReward, RewardOutcome, RewardProgress, TaskEdit,
    TaskLifecycle,
};
pub use task::record::TaskRecord;
pub use task::{
    BlockedReason, LifecycleAction, ReviewCycle, ReviewSchedule, ReviewStatus, Task, TaskStatus,
    TransitionError,
};
pub use wallet::{UserProfile, UserWallet};
