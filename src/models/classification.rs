use serde::{Deserialize, Serialize};

/// Coarse activity category assigned by the classification component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Academic,
    Productivity,
    Neutral,
    NonAcademic,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Academic,
        Category::Productivity,
        Category::Neutral,
        Category::NonAcademic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Academic => "academic",
            Category::Productivity => "productivity",
            Category::Neutral => "neutral",
            Category::NonAcademic => "non_academic",
        }
    }
}

/// Provenance of a classification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Stub,
    Database,
    Rules,
    Model,
    User,
    Api,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Stub => "stub",
            ClassificationSource::Database => "database",
            ClassificationSource::Rules => "rules",
            ClassificationSource::Model => "model",
            ClassificationSource::User => "user",
            ClassificationSource::Api => "api",
        }
    }
}

/// Classification stored alongside an activity event. Created once per
/// event, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub source: ClassificationSource,
}
