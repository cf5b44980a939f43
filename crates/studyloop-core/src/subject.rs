//! Study subjects and their accumulated experience.
//!
//! Experience only grows, and only through reward collection in the task
//! lifecycle. The ledger itself exposes creation, removal and reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result, ValidationError};
use crate::level::SubjectStats;
use crate::storage::{Store, WriteBatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    pub experience: u64,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Subject {
            name: name.into(),
            experience: 0,
            created_at: now,
        }
    }

    pub fn stats(&self) -> SubjectStats {
        SubjectStats::from_experience(self.experience)
    }

    pub(crate) fn credited(&self, experience: u64) -> Subject {
        Subject {
            experience: self.experience.saturating_add(experience),
            ..self.clone()
        }
    }
}

/// Read/administer view over the subjects collection.
pub struct SubjectLedger<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> SubjectLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Subject>> {
        Ok(self.store.list_subjects()?)
    }

    pub fn get(&self, name: &str) -> Result<Option<Subject>> {
        Ok(self.store.get_subject(name)?)
    }

    /// Like [`get`](Self::get) but a missing subject is `NotFound`.
    pub fn require(&self, name: &str) -> Result<Subject> {
        self.get(name)?
            .ok_or_else(|| CoreError::subject_not_found(name))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)?.is_some())
    }

    pub fn stats(&self, name: &str) -> Result<SubjectStats> {
        Ok(self.require(name)?.stats())
    }

    /// Create a subject with zero experience.
    ///
    /// The name is trimmed; empty and duplicate names are rejected.
    pub fn add(&self, name: &str, now: DateTime<Utc>) -> Result<Subject> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySubjectName.into());
        }
        if self.exists(name)? {
            return Err(ValidationError::DuplicateSubject(name.to_string()).into());
        }

        let subject = Subject::new(name, now);
        self.store
            .commit(WriteBatch::new().upsert_subject(subject.clone()))?;
        tracing::info!(subject = %subject.name, "subject added");
        Ok(subject)
    }

    /// Remove a subject. Tasks keep referring to it by name.
    pub fn remove(&self, name: &str) -> Result<Subject> {
        let subject = self.require(name)?;
        self.store
            .commit(WriteBatch::new().remove_subject(subject.name.clone()))?;
        tracing::info!(subject = %subject.name, experience = subject.experience, "subject removed");
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap()
    }

    #[test]
    fn add_trims_and_starts_at_zero() {
        let store = MemoryStore::new();
        let ledger = SubjectLedger::new(&store);
        let subject = ledger.add("  Math ", now()).unwrap();
        assert_eq!(subject.name, "Math");
        assert_eq!(subject.experience, 0);
        assert_eq!(ledger.list().unwrap(), vec![subject]);
    }

    #[test]
    fn add_rejects_empty_and_duplicate_names() {
        let store = MemoryStore::new();
        let ledger = SubjectLedger::new(&store);
        assert!(matches!(
            ledger.add("   ", now()),
            Err(CoreError::Validation(ValidationError::EmptySubjectName))
        ));

        ledger.add("Math", now()).unwrap();
        assert!(matches!(
            ledger.add("Math", now()),
            Err(CoreError::Validation(ValidationError::DuplicateSubject(_)))
        ));
    }

    #[test]
    fn remove_unknown_subject_is_not_found() {
        let store = MemoryStore::new();
        let ledger = SubjectLedger::new(&store);
        assert!(matches!(
            ledger.remove("History"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn remove_deletes_subject() {
        let store = MemoryStore::new();
        let ledger = SubjectLedger::new(&store);
        ledger.add("Math", now()).unwrap();
        ledger.remove("Math").unwrap();
        assert!(!ledger.exists("Math").unwrap());
    }

    #[test]
    fn credited_accumulates_experience() {
        let subject = Subject::new("Math", now()).credited(5).credited(10);
        assert_eq!(subject.experience, 15);
        assert_eq!(subject.stats().level, 1);
    }
}
