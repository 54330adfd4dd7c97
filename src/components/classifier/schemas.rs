use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ActivitySource, Category, ClassificationSource, GoogleContext, YouTubeContext};

/// Input accepted by the classifier. Built by the ingestion flow from an
/// activity event, or supplied directly when invoking the component by
/// name.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationInput {
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active_time: i64,
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub source: ActivitySource,
    #[serde(default)]
    pub activity_type: Option<String>,

    // Desktop-specific fields
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_path: Option<String>,
    #[serde(default)]
    pub window_title: Option<String>,

    // Optional context for better classification (browser only)
    #[serde(default)]
    pub youtube_context: Option<YouTubeContext>,
    #[serde(default)]
    pub google_context: Option<GoogleContext>,
    #[serde(default)]
    pub social_context: Option<Value>,
}

/// Full classifier output, including optional reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationOutput {
    pub category: Category,
    pub confidence: f64,
    pub source: ClassificationSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}
