//! In-memory store.
//!
//! Used by tests and ephemeral sessions. Commits are staged on a copy of the
//! state and swapped in only when every operation succeeds. Failures can be
//! injected to exercise the all-or-nothing contract.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{Store, WriteBatch, WriteOp};
use crate::error::{DatabaseError, RecordKind};
use crate::subject::Subject;
use crate::task::record::TaskRecord;
use crate::wallet::UserProfile;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tasks: BTreeMap<String, TaskRecord>,
    subjects: BTreeMap<String, Subject>,
    profile: Option<UserProfile>,
}

impl MemoryState {
    fn apply(&mut self, op: WriteOp) -> Result<(), DatabaseError> {
        match op {
            WriteOp::InsertTask(record) => {
                if self.tasks.contains_key(&record.id) {
                    return Err(DatabaseError::Conflict {
                        kind: RecordKind::Task,
                        id: record.id,
                    });
                }
                self.tasks.insert(record.id.clone(), record);
            }
            WriteOp::UpsertTask(record) => {
                self.tasks.insert(record.id.clone(), record);
            }
            WriteOp::RemoveTask(id) => {
                self.tasks.remove(&id);
            }
            WriteOp::UpsertSubject(subject) => {
                self.subjects.insert(subject.name.clone(), subject);
            }
            WriteOp::RemoveSubject(name) => {
                self.subjects.remove(&name);
            }
            WriteOp::UpsertProfile(profile) => {
                self.profile = Some(profile);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_commits: Mutex<usize>,
    commits: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` commits with `DatabaseError::WriteRejected`.
    pub fn fail_next_commits(&self, count: usize) {
        *lock(&self.failing_commits) = count;
    }

    /// Number of batches committed successfully.
    pub fn commit_count(&self) -> usize {
        *lock(&self.commits)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Store for MemoryStore {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        Ok(lock(&self.state).tasks.values().cloned().collect())
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, DatabaseError> {
        Ok(lock(&self.state).tasks.get(id).cloned())
    }

    fn list_subjects(&self) -> Result<Vec<Subject>, DatabaseError> {
        Ok(lock(&self.state).subjects.values().cloned().collect())
    }

    fn get_subject(&self, name: &str) -> Result<Option<Subject>, DatabaseError> {
        Ok(lock(&self.state).subjects.get(name).cloned())
    }

    fn get_profile(&self) -> Result<Option<UserProfile>, DatabaseError> {
        Ok(lock(&self.state).profile.clone())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), DatabaseError> {
        {
            let mut failing = lock(&self.failing_commits);
            if *failing > 0 {
                *failing -= 1;
                return Err(DatabaseError::WriteRejected(format!(
                    "injected failure for batch of {} writes",
                    batch.len()
                )));
            }
        }

        let mut state = lock(&self.state);
        let mut staged = state.clone();
        for op in batch.into_ops() {
            staged.apply(op)?;
        }
        *state = staged;
        *lock(&self.commits) += 1;
        Ok(())
    }
}
