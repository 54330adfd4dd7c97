//! End-to-end ingestion: batch in, classified rows out of the local
//! store, idempotent re-delivery. Remote sync stays disabled; the sync
//! service has its own unit tests against a fake store.

use focusd::config::Settings;
use focusd::models::{ActivityBatch, Category};
use focusd::Backend;
use serde_json::json;
use uuid::Uuid;

fn temp_settings() -> Settings {
    let dir = std::env::temp_dir()
        .join("focusd-tests")
        .join(Uuid::new_v4().to_string());
    std::fs::create_dir_all(&dir).unwrap();
    let mut settings = Settings::load(&dir);
    settings.remote_sync.enabled = false;
    settings
}

fn sample_batch() -> ActivityBatch {
    serde_json::from_value(json!({
        "type": "activity_batch",
        "events": [
            {
                "eventId": "evt-browser-1",
                "sessionId": "sess-1",
                "source": "browser",
                "timestamp": "2026-08-25T10:00:00Z",
                "startTime": "2026-08-25T09:58:00Z",
                "url": "https://github.com/rust-lang/rust/pulls",
                "domain": "github.com",
                "title": "Pull requests",
                "activeTime": 120,
                "idleTime": 5,
            },
            {
                "eventId": "evt-desktop-1",
                "sessionId": "sess-1",
                "source": "desktop",
                "activityType": "application",
                "timestamp": "2026-08-25T10:01:00Z",
                "startTime": "2026-08-25T10:00:30Z",
                "domain": "desktop",
                "appName": "Steam.exe",
                "windowTitle": "Library",
                "activeTime": 300,
            },
        ],
        "extensionVersion": "1.4.2",
        "timestamp": "2026-08-25T10:01:05Z",
    }))
    .unwrap()
}

#[tokio::test]
async fn batch_is_classified_and_persisted() {
    let backend = Backend::start(temp_settings()).await.unwrap();

    let outcome = backend.handle_activity_batch(sample_batch()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.received_count, 2);
    assert!(outcome.received_ids.contains(&"evt-browser-1".to_string()));
    assert!(outcome.received_ids.contains(&"evt-desktop-1".to_string()));
    assert!(outcome.errors.is_none());

    let events = backend.db().recent_events(10, None, None).await.unwrap();
    assert_eq!(events.len(), 2);

    let browser = backend.db().get_event("evt-browser-1").await.unwrap().unwrap();
    let classification = browser.classification.unwrap();
    assert_eq!(classification.category, Category::Productivity);
    assert!((classification.confidence - 0.80).abs() < f64::EPSILON);

    let desktop = backend.db().get_event("evt-desktop-1").await.unwrap().unwrap();
    let classification = desktop.classification.unwrap();
    assert_eq!(classification.category, Category::NonAcademic);
    assert!((classification.confidence - 0.85).abs() < f64::EPSILON);

    backend.shutdown().await;
}

#[tokio::test]
async fn redelivered_batch_is_acknowledged_without_duplicates() {
    let backend = Backend::start(temp_settings()).await.unwrap();

    backend.handle_activity_batch(sample_batch()).await.unwrap();
    let second = backend.handle_activity_batch(sample_batch()).await.unwrap();

    assert!(second.success);
    assert_eq!(second.received_count, 2);

    let stats = backend.db().activity_stats(None).await.unwrap();
    assert_eq!(stats.total_events, 2);
    assert_eq!(stats.total_active_time, 420);

    backend.shutdown().await;
}

#[tokio::test]
async fn health_reports_components_and_sync_state() {
    let backend = Backend::start(temp_settings()).await.unwrap();

    let health = backend.health();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["component_count"], 1);
    assert_eq!(
        health["components"]["classification"]["initialized"],
        json!(true)
    );
    assert_eq!(health["sync"]["enabled"], json!(false));
    assert_eq!(health["sync"]["connected"], json!(false));

    backend.shutdown().await;
}

#[tokio::test]
async fn ingest_succeeds_when_remote_store_is_unavailable() {
    let mut settings = temp_settings();
    settings.remote_sync.enabled = true;
    settings.remote_sync.uri = "not-a-connection-string".to_string();

    let backend = Backend::start(settings).await.unwrap();
    let outcome = backend.handle_activity_batch(sample_batch()).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.received_count, 2);
    assert!(backend.db().get_event("evt-browser-1").await.unwrap().is_some());
    assert_eq!(backend.health()["sync"]["enabled"], json!(false));

    backend.shutdown().await;
}

#[tokio::test]
async fn user_identity_survives_restart() {
    let settings = temp_settings();

    let backend = Backend::start(settings.clone()).await.unwrap();
    let first_id = backend.user_id().to_string();
    backend.shutdown().await;
    drop(backend);

    let backend = Backend::start(settings).await.unwrap();
    assert_eq!(backend.user_id(), first_id);
    backend.shutdown().await;
}
