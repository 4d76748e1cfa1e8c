//! Integration tests for progress reconciliation.
//!
//! Reports are merged through the progress service into SQLite databases
//! (in-memory, and file-backed for persistence) with the baseline schema.

use std::sync::Arc;

use chrono::Utc;
use dialog_sync::activity::{Activity, ActivityInstance};
use dialog_sync::config::{HostContext, PluginConfig};
use dialog_sync::database::Database;
use dialog_sync::database::models::{AttemptDbModel, AttemptKey};
use dialog_sync::database::repositories::{AttemptRepository, SqlxAttemptRepository};
use dialog_sync::host::{DisabledCompletion, NoopGradeBook};
use dialog_sync::notification::ProgressEventBroadcaster;
use dialog_sync::progress::ProgressService;
use dialog_sync::remote::RemoteProgressReport;
use serde_json::{Value, json};

const ACTIVITY_ID: i64 = 4;
const USER_ID: i64 = 21;
const VIDEO_ID: i64 = 5150;

struct Harness {
    service: ProgressService,
    attempts: Arc<SqlxAttemptRepository>,
    activity: Activity,
}

async fn setup() -> Harness {
    let db = Database::in_memory().await.expect("Failed to open database");
    let attempts = Arc::new(SqlxAttemptRepository::new(db.pool.clone(), db.write_pool.clone()));
    let service = ProgressService::new(
        attempts.clone(),
        ProgressEventBroadcaster::new(),
        Arc::new(NoopGradeBook),
        Arc::new(DisabledCompletion),
    );
    let instance = ActivityInstance {
        id: ACTIVITY_ID,
        course_id: 1,
        ..Default::default()
    };
    let activity = Activity::new(
        instance,
        40,
        &HostContext::new(USER_ID, 1),
        PluginConfig::default(),
        Utc::now(),
    );
    Harness {
        service,
        attempts,
        activity,
    }
}

fn report(value: Value) -> RemoteProgressReport {
    serde_json::from_value(value).expect("Invalid report fixture")
}

fn watch_report() -> RemoteProgressReport {
    report(json!({
        "dialogID": VIDEO_ID,
        "activities": [{
            "activityTypeID": 9,
            "completed": 1,
            "watchedDialogLines": [{"dialogLineID": 101}, {"dialogLineID": 102}]
        }]
    }))
}

fn learn_report() -> RemoteProgressReport {
    report(json!({
        "dialogID": VIDEO_ID,
        "activities": [{
            "activityTypeID": 10,
            "completed": 0,
            "learnedDialogLines": [{"learnedWords": [
                {"wordHeadID": 55, "completed": 1},
                {"wordHeadID": 56, "completed": 0}
            ]}]
        }]
    }))
}

async fn stored(h: &Harness) -> AttemptDbModel {
    h.attempts
        .find(AttemptKey::new(ACTIVITY_ID, USER_ID, VIDEO_ID))
        .await
        .expect("Query failed")
        .expect("Attempt missing")
}

fn progress_columns(row: &AttemptDbModel) -> AttemptDbModel {
    AttemptDbModel {
        created_at: 0,
        updated_at: 0,
        ..row.clone()
    }
}

#[tokio::test]
async fn test_first_watch_report_creates_attempt() {
    let h = setup().await;
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();

    let row = stored(&h).await;
    assert_eq!(row.watch_complete, 1);
    assert_eq!(row.watch_count, 2);
    assert_eq!(row.watch_line_ids, "101,102");
    assert_eq!(row.learn_count, 0);
    assert_eq!(row.learn_word_ids, "");
}

#[tokio::test]
async fn test_replayed_report_is_identical() {
    let h = setup().await;
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();
    let first = stored(&h).await;

    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();
    let second = stored(&h).await;

    assert_eq!(progress_columns(&first), progress_columns(&second));
}

#[tokio::test]
async fn test_learn_report_adds_completed_words_only() {
    let h = setup().await;
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();
    let after_watch = stored(&h).await;

    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &learn_report())
        .await
        .unwrap();
    let row = stored(&h).await;

    assert_eq!(row.learn_count, 1);
    assert_eq!(row.learn_word_ids, "55");
    // Completion flags describe the latest report only.
    assert_eq!(after_watch.watch_complete, 1);
    assert_eq!(row.watch_complete, 0);
    assert_eq!(row.watch_count, after_watch.watch_count);
    assert_eq!(row.watch_line_ids, after_watch.watch_line_ids);
}

#[tokio::test]
async fn test_report_without_activities_keeps_state() {
    let h = setup().await;
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();
    let before = stored(&h).await;

    h.service
        .update_progress(
            &h.activity,
            USER_ID,
            VIDEO_ID,
            &report(json!({"dialogID": VIDEO_ID, "totalPoints": 500})),
        )
        .await
        .unwrap();
    let after = stored(&h).await;

    assert_eq!(progress_columns(&before), progress_columns(&after));
}

#[tokio::test]
async fn test_concurrent_duplicate_reports_converge() {
    let h = Arc::new(setup().await);
    let mut handles = Vec::new();
    for _ in 0..4 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.service
                .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
                .await
                .map(|row| row.id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "all deliveries must update the same row");

    let rows = h.service.attempts(ACTIVITY_ID, USER_ID, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].watch_line_ids, "101,102");
}

#[tokio::test]
async fn test_summary_sums_videos() {
    let h = setup().await;
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID, &watch_report())
        .await
        .unwrap();
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID + 1, &watch_report())
        .await
        .unwrap();
    h.service
        .update_progress(&h.activity, USER_ID, VIDEO_ID + 1, &learn_report())
        .await
        .unwrap();

    let summary = h.service.summary(ACTIVITY_ID, USER_ID).await.unwrap();
    // The learn report left the second video without a completed watch.
    assert_eq!(summary.watch, 1);
    assert_eq!(summary.learn, 1);
    assert_eq!(summary.speak, 0);
}

#[tokio::test]
async fn test_file_database_persists_progress() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("progress.db").display());
    let key = AttemptKey::new(ACTIVITY_ID, USER_ID, VIDEO_ID);

    {
        let db = Database::open(&url).await.unwrap();
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&db.write_pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let attempts = SqlxAttemptRepository::new(db.pool.clone(), db.write_pool.clone());
        attempts
            .upsert_with(key, &|_| {
                let mut row = AttemptDbModel::new(key);
                row.chat_question_ids = "q1,q2".to_string();
                row.chat_count = 2;
                row
            })
            .await
            .unwrap();
        db.pool.close().await;
        db.write_pool.close().await;
    }

    let db = Database::open(&url).await.unwrap();
    let attempts = SqlxAttemptRepository::new(db.pool.clone(), db.write_pool.clone());
    let row = attempts.find(key).await.unwrap().unwrap();
    assert_eq!(row.chat_question_ids, "q1,q2");
    assert_eq!(row.chat_count, 2);
}
