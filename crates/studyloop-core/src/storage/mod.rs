//! Persistence for tasks, subjects and the user profile.
//!
//! The lifecycle only talks to the [`Store`] trait. Every write goes through
//! [`Store::commit`], which applies a [`WriteBatch`] atomically: either every
//! operation in the batch lands or none does.

mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, ReviewConfig, RewardsConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::{ConfigError, CoreError, DatabaseError};
use crate::subject::Subject;
use crate::task::record::TaskRecord;
use crate::wallet::UserProfile;

/// Returns `~/.config/studyloop[-dev]/` based on STUDYLOOP_ENV.
///
/// Set STUDYLOOP_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYLOOP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyloop-dev")
    } else {
        base_dir.join("studyloop")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Record store backing the lifecycle.
pub trait Store {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError>;

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, DatabaseError>;

    fn list_subjects(&self) -> Result<Vec<Subject>, DatabaseError>;

    fn get_subject(&self, name: &str) -> Result<Option<Subject>, DatabaseError>;

    fn get_profile(&self) -> Result<Option<UserProfile>, DatabaseError>;

    /// Apply all operations in `batch` as one unit.
    ///
    /// # Errors
    /// On any failure nothing from the batch is persisted.
    fn commit(&self, batch: WriteBatch) -> Result<(), DatabaseError>;
}

impl<S: Store + ?Sized> Store for &S {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        (**self).list_tasks()
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, DatabaseError> {
        (**self).get_task(id)
    }

    fn list_subjects(&self) -> Result<Vec<Subject>, DatabaseError> {
        (**self).list_subjects()
    }

    fn get_subject(&self, name: &str) -> Result<Option<Subject>, DatabaseError> {
        (**self).get_subject(name)
    }

    fn get_profile(&self) -> Result<Option<UserProfile>, DatabaseError> {
        (**self).get_profile()
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), DatabaseError> {
        (**self).commit(batch)
    }
}

/// Single write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Fails with `DatabaseError::Conflict` if the id exists.
    InsertTask(TaskRecord),
    UpsertTask(TaskRecord),
    RemoveTask(String),
    /// Insert-or-replace keyed by subject name.
    UpsertSubject(Subject),
    RemoveSubject(String),
    UpsertProfile(UserProfile),
}

/// Ordered set of writes committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(mut self, record: TaskRecord) -> Self {
        self.ops.push(WriteOp::InsertTask(record));
        self
    }

    pub fn upsert_task(mut self, record: TaskRecord) -> Self {
        self.ops.push(WriteOp::UpsertTask(record));
        self
    }

    pub fn remove_task(mut self, id: impl Into<String>) -> Self {
        self.ops.push(WriteOp::RemoveTask(id.into()));
        self
    }

    pub fn upsert_subject(mut self, subject: Subject) -> Self {
        self.ops.push(WriteOp::UpsertSubject(subject));
        self
    }

    pub fn remove_subject(mut self, name: impl Into<String>) -> Self {
        self.ops.push(WriteOp::RemoveSubject(name.into()));
        self
    }

    pub fn upsert_profile(mut self, profile: UserProfile) -> Self {
        self.ops.push(WriteOp::UpsertProfile(profile));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
