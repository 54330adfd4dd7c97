use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where an activity event was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySource {
    #[default]
    Browser,
    Desktop,
}

impl ActivitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySource::Browser => "browser",
            ActivitySource::Desktop => "desktop",
        }
    }
}

/// YouTube-specific context reported by the browser extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YouTubeContext {
    pub is_video: Option<bool>,
    pub video_id: Option<String>,
    pub is_playlist: Option<bool>,
    pub is_channel: Option<bool>,
    pub is_search: Option<bool>,
    pub search_query: Option<String>,
    pub title_for_classification: Option<String>,
}

/// Google services context reported by the browser extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleContext {
    pub service: Option<String>,
    pub is_search: Option<bool>,
    pub search_query: Option<String>,
    pub is_scholar: Option<bool>,
    pub is_docs: Option<bool>,
    pub is_drive: Option<bool>,
    pub is_classroom: Option<bool>,
}

fn default_activity_type() -> String {
    "webpage".to_string()
}

/// Incoming activity event from the browser extension or desktop tracker.
/// Immutable once classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub event_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub source: ActivitySource,
    #[serde(default = "default_activity_type")]
    pub activity_type: String,

    pub timestamp: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub title: String,

    // Desktop-specific fields
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_path: Option<String>,
    #[serde(default)]
    pub window_title: Option<String>,

    // Time tracking (seconds)
    #[serde(default)]
    pub active_time: i64,
    #[serde(default)]
    pub idle_time: i64,

    // Optional enrichment from the extension
    #[serde(default)]
    pub url_components: Option<Value>,
    #[serde(default)]
    pub title_hints: Option<Value>,
    #[serde(default)]
    pub engagement: Option<Value>,
    #[serde(default)]
    pub youtube_context: Option<YouTubeContext>,
    #[serde(default)]
    pub google_context: Option<GoogleContext>,
    #[serde(default)]
    pub social_context: Option<Value>,
}

impl ActivityEvent {
    /// Group the optional contexts into one JSON object, the shape stored
    /// locally and mirrored remotely. `None` when the event carries no
    /// context at all.
    pub fn context_data(&self) -> Option<Value> {
        let mut map = serde_json::Map::new();
        if let Some(context) = &self.youtube_context {
            map.insert(
                "youtube".to_string(),
                serde_json::to_value(context).unwrap_or(Value::Null),
            );
        }
        if let Some(context) = &self.google_context {
            map.insert(
                "google".to_string(),
                serde_json::to_value(context).unwrap_or(Value::Null),
            );
        }
        if let Some(context) = &self.social_context {
            map.insert("social".to_string(), context.clone());
        }

        if map.is_empty() {
            None
        } else {
            Some(Value::Object(map))
        }
    }
}

fn default_batch_type() -> String {
    "activity_batch".to_string()
}

/// Batch submission from the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBatch {
    #[serde(rename = "type", default = "default_batch_type")]
    pub kind: String,
    pub events: Vec<ActivityEvent>,
    pub extension_version: String,
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgment returned to the submitter. Reflects local persistence
/// only; mirror-sync health is reported through the status surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub success: bool,
    pub received_count: usize,
    pub received_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}
