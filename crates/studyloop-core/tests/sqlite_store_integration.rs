//! Integration tests for the on-disk SQLite store.
//!
//! Each test opens a fresh database file in a temporary directory, so state
//! persisting across reopen is observable.

use chrono::{Duration, TimeZone, Utc};
use studyloop_core::task::record::TaskRecord;
use studyloop_core::{
    Config, ManualClock, NewTask, ReviewCycle, SqliteStore, Store, TaskFilter, TaskLifecycle,
    WriteBatch,
};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap())
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studyloop.db");
    let clock = clock();

    let task_id = {
        let mut lc = TaskLifecycle::new(SqliteStore::open_at(&path).unwrap(), clock.clone());
        lc.add_subject("Math").unwrap();
        let task = lc.create(NewTask::new("Read chapter 3", "Math", true)).unwrap();
        lc.complete(&task.id).unwrap();
        clock.advance(Duration::hours(12));
        lc.collect_reward(&task.id).unwrap().unwrap();
        task.id
    };

    let lc = TaskLifecycle::new(SqliteStore::open_at(&path).unwrap(), clock.clone());
    let task = lc.task(&task_id).unwrap();
    assert!(task.is_rewarded());
    assert_eq!(task.review_cycle(), Some(ReviewCycle::First));
    assert_eq!(
        task.next_review_date(),
        Some(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap())
    );
    assert_eq!(lc.wallet().balance().unwrap(), 5);
    assert_eq!(lc.subjects().stats("Math").unwrap().total_experience, 5);
}

#[test]
fn test_filters_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let clock = clock();
    let mut lc = TaskLifecycle::new(
        SqliteStore::open_at(dir.path().join("studyloop.db")).unwrap(),
        clock.clone(),
    );
    lc.add_subject("Math").unwrap();
    let open = lc.create(NewTask::new("Open", "Math", false)).unwrap();
    let done = lc.create(NewTask::new("Done", "Math", false)).unwrap();
    lc.complete(&done.id).unwrap();

    let active = lc.list(TaskFilter::Active).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, open.id);
    assert_eq!(lc.list(TaskFilter::Completed).unwrap().len(), 1);
    assert_eq!(lc.list(TaskFilter::All).unwrap().len(), 2);
    assert!(lc.list(TaskFilter::Review).unwrap().is_empty());

    let board = lc.board().unwrap();
    assert_eq!(board.in_progress.len(), 1);
    assert_eq!(board.waiting_for_reward.len(), 1);
}

#[test]
fn test_config_drives_lifecycle_settings() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.set("rewards.delay_seconds", "60").unwrap();
    config.set("rewards.completion_coins", "3").unwrap();
    config.save_to(&config_path).unwrap();

    let config = Config::load_from(&config_path).unwrap();
    let clock = clock();
    let mut lc = TaskLifecycle::with_settings(
        SqliteStore::open_at(dir.path().join("studyloop.db")).unwrap(),
        clock.clone(),
        config.lifecycle_settings(),
    );
    lc.add_subject("Math").unwrap();
    let task = lc.create(NewTask::new("Read", "Math", false)).unwrap();
    lc.complete(&task.id).unwrap();
    clock.advance(Duration::seconds(60));

    let outcome = lc.collect_reward(&task.id).unwrap().unwrap();
    assert_eq!(outcome.coins, 3);
    assert_eq!(outcome.experience, 5);
}

#[test]
fn test_batch_failure_rolls_back_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_at(dir.path().join("studyloop.db")).unwrap();
    let clock = clock();
    let mut lc = TaskLifecycle::new(&store, clock.clone());
    lc.add_subject("Math").unwrap();
    let task = lc.create(NewTask::new("Read", "Math", false)).unwrap();

    let record = TaskRecord::from(&task);
    let result = store.commit(
        WriteBatch::new()
            .remove_task(task.id.clone())
            .insert_task(record.clone())
            .insert_task(record),
    );
    assert!(result.is_err());
    assert!(store.get_task(&task.id).unwrap().is_some());
}
