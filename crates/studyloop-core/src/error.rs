//! Core error types for studyloop-core.
//!
//! Business preconditions that fail because of timing (collecting a reward too
//! early, completing a task twice) are not errors: lifecycle operations report
//! them as `Ok(None)`. Everything in this module is surfaced to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any mutation was attempted
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A task or subject id did not resolve
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// Persistence failed; nothing from the operation was committed
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn task_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: RecordKind::Task,
            id: id.into(),
        }
    }

    pub fn subject_not_found(name: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: RecordKind::Subject,
            id: name.into(),
        }
    }
}

/// Record collection an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Task,
    Subject,
    Profile,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Task => write!(f, "Task"),
            RecordKind::Subject => write!(f, "Subject"),
            RecordKind::Profile => write!(f, "Profile"),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Insert collided with an existing key
    #[error("{kind} already exists: {id}")]
    Conflict { kind: RecordKind, id: String },

    /// A stored row violates the task state invariants
    #[error("Corrupt {kind} record '{id}': {message}")]
    CorruptRecord {
        kind: RecordKind,
        id: String,
        message: String,
    },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Backend refused the write (used by test doubles)
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not resolve the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Task text is empty after trimming
    #[error("Task text cannot be empty")]
    EmptyText,

    /// Subject name is empty after trimming
    #[error("Subject name cannot be empty")]
    EmptySubjectName,

    /// Task references a subject that does not exist
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    /// Subject name already taken
    #[error("Subject already exists: {0}")]
    DuplicateSubject(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _msg) => {
                if failure.code == rusqlite::ErrorCode::DatabaseBusy
                    || failure.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
