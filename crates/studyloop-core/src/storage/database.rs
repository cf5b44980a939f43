//! SQLite-backed record store.
//!
//! Stores tasks, subjects and the user profile at
//! `~/.config/studyloop/studyloop.db`. Timestamps are RFC 3339 text.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{data_dir, migrations, Store, WriteBatch, WriteOp};
use crate::error::{CoreError, DatabaseError, RecordKind};
use crate::subject::Subject;
use crate::task::record::{ReviewStage, TaskRecord};
use crate::wallet::{UserProfile, PROFILE_ID};

const TASK_COLUMNS: &str = "id, text, subject, completed, completed_at, rewarded, requires_review,
     review_cycle, next_review_date, review_completed_at, is_in_review_waiting,
     review_rewarded, created_at";

/// Raw task row before timestamp parsing.
struct TaskRow {
    id: String,
    text: String,
    subject: String,
    completed: bool,
    completed_at: Option<String>,
    rewarded: bool,
    requires_review: bool,
    review_cycle: Option<String>,
    next_review_date: Option<String>,
    review_completed_at: Option<String>,
    is_in_review_waiting: Option<bool>,
    review_rewarded: Option<bool>,
    created_at: String,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(TaskRow {
            id: row.get(0)?,
            text: row.get(1)?,
            subject: row.get(2)?,
            completed: row.get(3)?,
            completed_at: row.get(4)?,
            rewarded: row.get(5)?,
            requires_review: row.get(6)?,
            review_cycle: row.get(7)?,
            next_review_date: row.get(8)?,
            review_completed_at: row.get(9)?,
            is_in_review_waiting: row.get(10)?,
            review_rewarded: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<TaskRecord, DatabaseError> {
        let id = self.id;
        let timestamp = |value: Option<String>| -> Result<Option<DateTime<Utc>>, DatabaseError> {
            value.map(|v| parse_datetime(RecordKind::Task, &id, &v)).transpose()
        };
        let review_cycle = match self.review_cycle {
            Some(value) => Some(ReviewStage::parse(&value).ok_or_else(|| {
                DatabaseError::CorruptRecord {
                    kind: RecordKind::Task,
                    id: id.clone(),
                    message: format!("unknown review cycle '{value}'"),
                }
            })?),
            None => None,
        };

        Ok(TaskRecord {
            completed_at: timestamp(self.completed_at)?,
            next_review_date: timestamp(self.next_review_date)?,
            review_completed_at: timestamp(self.review_completed_at)?,
            created_at: parse_datetime(RecordKind::Task, &id, &self.created_at)?,
            text: self.text,
            subject: self.subject,
            completed: self.completed,
            rewarded: self.rewarded,
            requires_review: self.requires_review,
            review_cycle,
            is_in_review_waiting: self.is_in_review_waiting,
            review_rewarded: self.review_rewarded,
            id,
        })
    }
}

fn parse_datetime(kind: RecordKind, id: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRecord {
            kind,
            id: id.to_string(),
            message: format!("invalid timestamp '{value}': {e}"),
        })
}

fn format_datetime(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// SQLite database for study records.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/studyloop/studyloop.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studyloop.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        tracing::debug!(
            version = migrations::get_schema_version(&conn),
            "database ready"
        );
        Ok(Self { conn })
    }

    fn apply(tx: &rusqlite::Transaction<'_>, op: WriteOp) -> Result<(), DatabaseError> {
        match op {
            WriteOp::InsertTask(record) => match write_task(tx, "INSERT", &record) {
                Err(e) if is_constraint_violation(&e) => {
                    return Err(DatabaseError::Conflict {
                        kind: RecordKind::Task,
                        id: record.id,
                    });
                }
                other => {
                    other?;
                }
            },
            WriteOp::UpsertTask(record) => {
                write_task(tx, "INSERT OR REPLACE", &record)?;
            }
            WriteOp::RemoveTask(id) => {
                tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            }
            WriteOp::UpsertSubject(subject) => {
                tx.execute(
                    "INSERT OR REPLACE INTO subjects (name, experience, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![
                        subject.name,
                        subject.experience,
                        subject.created_at.to_rfc3339()
                    ],
                )?;
            }
            WriteOp::RemoveSubject(name) => {
                tx.execute("DELETE FROM subjects WHERE name = ?1", params![name])?;
            }
            WriteOp::UpsertProfile(profile) => {
                tx.execute(
                    "INSERT OR REPLACE INTO user_profile (id, coins) VALUES (?1, ?2)",
                    params![profile.id, profile.coins],
                )?;
            }
        }
        Ok(())
    }
}

fn write_task(
    tx: &rusqlite::Transaction<'_>,
    verb: &str,
    record: &TaskRecord,
) -> Result<usize, rusqlite::Error> {
    tx.execute(
        &format!(
            "{verb} INTO tasks ({TASK_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            record.id,
            record.text,
            record.subject,
            record.completed,
            format_datetime(record.completed_at),
            record.rewarded,
            record.requires_review,
            record.review_cycle.map(|stage| stage.as_str()),
            format_datetime(record.next_review_date),
            format_datetime(record.review_completed_at),
            record.is_in_review_waiting,
            record.review_rewarded,
            record.created_at.to_rfc3339(),
        ],
    )
}

impl Store for SqliteStore {
    fn list_tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC, id ASC"))?;
        let rows = stmt.query_map([], TaskRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                TaskRow::from_row,
            )
            .optional()?;
        row.map(TaskRow::into_record).transpose()
    }

    fn list_subjects(&self) -> Result<Vec<Subject>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, experience, created_at FROM subjects ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut subjects = Vec::new();
        for row in rows {
            let (name, experience, created_at) = row?;
            let created_at = parse_datetime(RecordKind::Subject, &name, &created_at)?;
            subjects.push(Subject {
                name,
                experience,
                created_at,
            });
        }
        Ok(subjects)
    }

    fn get_subject(&self, name: &str) -> Result<Option<Subject>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT name, experience, created_at FROM subjects WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((name, experience, created_at)) => {
                let created_at = parse_datetime(RecordKind::Subject, &name, &created_at)?;
                Ok(Some(Subject {
                    name,
                    experience,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    fn get_profile(&self) -> Result<Option<UserProfile>, DatabaseError> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, coins FROM user_profile WHERE id = ?1",
                params![PROFILE_ID],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        coins: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for op in batch.into_ops() {
            Self::apply(&tx, op)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap()
    }

    #[test]
    fn task_roundtrip_preserves_absent_review_fields() {
        let store = SqliteStore::open_memory().unwrap();
        let record = TaskRecord::from(&Task::new("Read", "Math", false, now()));
        store
            .commit(WriteBatch::new().insert_task(record.clone()))
            .unwrap();

        let loaded = store.get_task(&record.id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(loaded.review_cycle.is_none());
        assert!(loaded.is_in_review_waiting.is_none());
    }

    #[test]
    fn review_task_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let record = TaskRecord::from(&Task::new("Read", "Math", true, now()));
        store
            .commit(WriteBatch::new().insert_task(record.clone()))
            .unwrap();
        let loaded = store.list_tasks().unwrap();
        assert_eq!(loaded, vec![record]);
        assert_eq!(loaded[0].review_cycle, Some(ReviewStage::First));
        assert_eq!(loaded[0].is_in_review_waiting, Some(false));
    }

    #[test]
    fn duplicate_insert_is_a_conflict_and_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let record = TaskRecord::from(&Task::new("Read", "Math", false, now()));
        store
            .commit(WriteBatch::new().insert_task(record.clone()))
            .unwrap();

        let subject = Subject::new("Math", now());
        let err = store
            .commit(
                WriteBatch::new()
                    .upsert_subject(subject)
                    .insert_task(record),
            )
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict { .. }));
        assert!(store.get_subject("Math").unwrap().is_none());
    }

    #[test]
    fn subject_upsert_replaces_by_name() {
        let store = SqliteStore::open_memory().unwrap();
        let mut subject = Subject::new("Math", now());
        store
            .commit(WriteBatch::new().upsert_subject(subject.clone()))
            .unwrap();
        subject.experience = 15;
        store
            .commit(WriteBatch::new().upsert_subject(subject.clone()))
            .unwrap();

        let subjects = store.list_subjects().unwrap();
        assert_eq!(subjects, vec![subject]);
    }

    #[test]
    fn profile_is_absent_until_written() {
        let store = SqliteStore::open_memory().unwrap();
        assert!(store.get_profile().unwrap().is_none());
        let profile = UserProfile {
            coins: 25,
            ..UserProfile::default()
        };
        store
            .commit(WriteBatch::new().upsert_profile(profile.clone()))
            .unwrap();
        assert_eq!(store.get_profile().unwrap(), Some(profile));
    }

    #[test]
    fn corrupt_timestamp_is_reported() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO subjects (name, experience, created_at) VALUES ('Math', 0, 'yesterday')",
                [],
            )
            .unwrap();
        let err = store.get_subject("Math").unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRecord { .. }));
    }

    #[test]
    fn remove_task_deletes_row() {
        let store = SqliteStore::open_memory().unwrap();
        let record = TaskRecord::from(&Task::new("Read", "Math", false, now()));
        store
            .commit(WriteBatch::new().insert_task(record.clone()))
            .unwrap();
        store
            .commit(WriteBatch::new().remove_task(record.id.clone()))
            .unwrap();
        assert!(store.get_task(&record.id).unwrap().is_none());
    }
}
