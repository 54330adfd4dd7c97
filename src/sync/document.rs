use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ActivityEvent, ActivitySource, Classification};

/// Optional structured hints grouped under one sub-object in the remote
/// document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncEnrichment {
    pub url_components: Option<Value>,
    pub title_hints: Option<Value>,
    pub engagement: Option<Value>,
    pub context_data: Option<Value>,
}

/// Flattened, self-contained projection of an activity event plus its
/// classification, keyed by `event_id`. `event_id` is the idempotency key
/// for the remote store: re-sending the same document is an overwrite,
/// never a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDocument {
    pub event_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub source: ActivitySource,
    pub activity_type: String,

    pub timestamp: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    pub url: String,
    pub domain: String,
    pub path: String,
    pub title: String,

    pub app_name: Option<String>,
    pub app_path: Option<String>,
    pub window_title: Option<String>,

    pub active_time: i64,
    pub idle_time: i64,

    pub classification: Option<Classification>,
    pub enrichment: SyncEnrichment,

    /// Assigned when the document is built, not when it lands remotely.
    pub synced_at: DateTime<Utc>,
}

/// Pure projection of an event into its remote-store document. No side
/// effects.
pub fn build_document(
    event: &ActivityEvent,
    classification: Option<&Classification>,
    user_id: &str,
) -> SyncDocument {
    SyncDocument {
        event_id: event.event_id.clone(),
        user_id: user_id.to_string(),
        session_id: event.session_id.clone(),
        source: event.source,
        activity_type: event.activity_type.clone(),
        timestamp: event.timestamp,
        start_time: event.start_time,
        end_time: event.end_time,
        url: event.url.clone(),
        domain: event.domain.clone(),
        path: event.path.clone(),
        title: event.title.clone(),
        app_name: event.app_name.clone(),
        app_path: event.app_path.clone(),
        window_title: event.window_title.clone(),
        active_time: event.active_time,
        idle_time: event.idle_time,
        classification: classification.cloned(),
        enrichment: SyncEnrichment {
            url_components: event.url_components.clone(),
            title_hints: event.title_hints.clone(),
            engagement: event.engagement.clone(),
            context_data: event.context_data(),
        },
        synced_at: Utc::now(),
    }
}
