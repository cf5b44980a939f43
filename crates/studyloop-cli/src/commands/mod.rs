pub mod config;
pub mod subject;
pub mod task;
pub mod wallet;

use studyloop_core::{Config, SqliteStore, TaskLifecycle};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Open the on-disk store with settings from the user's config.
pub fn open_lifecycle() -> Result<TaskLifecycle<SqliteStore>, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let store = SqliteStore::open()?;
    tracing::debug!(
        delay_secs = config.rewards.delay_seconds,
        utc_offset_minutes = config.review.utc_offset_minutes,
        "opening lifecycle"
    );
    Ok(TaskLifecycle::with_settings(
        store,
        studyloop_core::SystemClock,
        config.lifecycle_settings(),
    ))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
