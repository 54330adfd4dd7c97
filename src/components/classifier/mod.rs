//! Rule-based classification component.
//!
//! This is the stub implementation of the classification contract: simple
//! pattern tables over domains, app names and titles. A model-backed
//! classifier (Homepage2Vec, local LLM, user feedback) will replace it
//! behind the same `Component` interface.

mod rules;
mod schemas;

pub use schemas::{ClassificationInput, ClassificationOutput};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use log::info;
use serde::Serialize;
use serde_json::{json, Value};

use crate::components::Component;
use crate::models::{ActivitySource, Category, ClassificationSource, GoogleContext, YouTubeContext};

/// Deterministic confidence for events no rule matched: low but non-zero,
/// and visibly distinct from any rule-assigned confidence.
const DEFAULT_NEUTRAL_CONFIDENCE: f64 = 0.55;

#[derive(Debug, Default, Clone, Serialize)]
struct CategoryCounts {
    academic: u64,
    productivity: u64,
    neutral: u64,
    non_academic: u64,
}

impl CategoryCounts {
    fn increment(&mut self, category: Category) {
        match category {
            Category::Academic => self.academic += 1,
            Category::Productivity => self.productivity += 1,
            Category::Neutral => self.neutral += 1,
            Category::NonAcademic => self.non_academic += 1,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
struct ClassifierStats {
    total_classified: u64,
    by_category: CategoryCounts,
}

pub struct ClassifierComponent {
    initialized: AtomicBool,
    stats: Mutex<ClassifierStats>,
}

impl ClassifierComponent {
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            stats: Mutex::new(ClassifierStats::default()),
        }
    }

    fn classify(&self, input: &ClassificationInput) -> ClassificationOutput {
        match input.source {
            ActivitySource::Desktop => self.classify_desktop(input),
            ActivitySource::Browser => self.classify_browser(input),
        }
    }

    fn classify_browser(&self, input: &ClassificationInput) -> ClassificationOutput {
        let domain = input.domain.to_lowercase();
        let url = input.url.to_lowercase();
        let title = input.title.to_lowercase();

        let (mut category, mut confidence, matched_rule) =
            classify_by_domain_rules(&domain, &url, &title);

        // Context overlays may override the domain-rule result.
        if let Some(context) = &input.youtube_context {
            (category, confidence) = classify_youtube(context);
        }
        if let Some(context) = &input.google_context {
            (category, confidence) = classify_google(context, category);
        }

        ClassificationOutput {
            category,
            confidence,
            source: ClassificationSource::Stub,
            matched_rule,
            explanation: None,
        }
    }

    fn classify_desktop(&self, input: &ClassificationInput) -> ClassificationOutput {
        let app = normalize_app_name(input.app_name.as_deref().unwrap_or(""));
        let window_title = input
            .window_title
            .as_deref()
            .unwrap_or("")
            .to_lowercase();

        let (category, confidence, matched_rule) = classify_by_app_rules(&app, &window_title);

        ClassificationOutput {
            category,
            confidence,
            source: ClassificationSource::Stub,
            matched_rule,
            explanation: None,
        }
    }

    fn record(&self, category: Category) {
        let mut stats = self.stats.lock().unwrap();
        stats.total_classified += 1;
        stats.by_category.increment(category);
    }
}

impl Default for ClassifierComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ClassifierComponent {
    fn name(&self) -> &str {
        "classification"
    }

    fn version(&self) -> &str {
        "0.1.0-stub"
    }

    fn dependencies(&self) -> &[&str] {
        &[]
    }

    fn initialize(&self, _config: &Value) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        info!(
            "Classifier stub initialized (v{}): {} academic, {} productivity, {} non-academic domains",
            self.version(),
            rules::ACADEMIC_DOMAINS.len(),
            rules::PRODUCTIVITY_DOMAINS.len(),
            rules::NON_ACADEMIC_DOMAINS.len(),
        );
        Ok(())
    }

    fn process(&self, input: &Value) -> Result<Value> {
        if !self.initialized.load(Ordering::SeqCst) {
            bail!("component 'classification' not initialized");
        }

        let input: ClassificationInput = match serde_json::from_value(input.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                // Malformed input degrades to a safe default instead of
                // propagating to the caller.
                let fallback = ClassificationOutput {
                    category: Category::Neutral,
                    confidence: 0.5,
                    source: ClassificationSource::Stub,
                    matched_rule: None,
                    explanation: Some(format!("parse error: {err}")),
                };
                return Ok(serde_json::to_value(fallback)?);
            }
        };

        let output = self.classify(&input);
        self.record(output.category);

        Ok(serde_json::to_value(output)?)
    }

    fn status(&self) -> Value {
        let stats = self.stats.lock().unwrap().clone();
        json!({
            "name": self.name(),
            "version": self.version(),
            "initialized": self.initialized.load(Ordering::SeqCst),
            "type": "stub",
            "model_loaded": false,
            "stats": stats,
            "rules": {
                "academic_patterns": rules::ACADEMIC_DOMAINS.len(),
                "productivity_patterns": rules::PRODUCTIVITY_DOMAINS.len(),
                "non_academic_patterns": rules::NON_ACADEMIC_DOMAINS.len(),
            },
        })
    }
}

/// Browser rules, in fixed priority order: academic domains win over
/// productivity, which win over non-academic, then TLD and title
/// heuristics, then the deterministic neutral default.
fn classify_by_domain_rules(
    domain: &str,
    url: &str,
    title: &str,
) -> (Category, f64, Option<String>) {
    for pattern in rules::ACADEMIC_DOMAINS {
        if domain.contains(pattern) || url.contains(pattern) {
            return (
                Category::Academic,
                0.85,
                Some(format!("academic_domain:{pattern}")),
            );
        }
    }

    for pattern in rules::PRODUCTIVITY_DOMAINS {
        if domain.contains(pattern) {
            return (
                Category::Productivity,
                0.80,
                Some(format!("productivity_domain:{pattern}")),
            );
        }
    }

    for pattern in rules::NON_ACADEMIC_DOMAINS {
        if domain.contains(pattern) {
            return (
                Category::NonAcademic,
                0.85,
                Some(format!("non_academic_domain:{pattern}")),
            );
        }
    }

    if rules::EDUCATIONAL_TLDS.iter().any(|tld| domain.ends_with(tld)) {
        return (Category::Academic, 0.90, Some("educational_tld".to_string()));
    }

    if rules::ACADEMIC_TITLE_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        return (Category::Academic, 0.65, Some("title_keywords".to_string()));
    }

    (Category::Neutral, DEFAULT_NEUTRAL_CONFIDENCE, None)
}

/// Desktop rules: app name sets first (academic, productivity,
/// non-academic, neutral/system), then window-title keyword buckets, then
/// the unknown-app default.
fn classify_by_app_rules(app: &str, window_title: &str) -> (Category, f64, Option<String>) {
    if !app.is_empty() {
        for pattern in rules::ACADEMIC_APPS {
            if app.contains(pattern) {
                return (
                    Category::Academic,
                    0.90,
                    Some(format!("academic_app:{pattern}")),
                );
            }
        }
        for pattern in rules::PRODUCTIVITY_APPS {
            if app.contains(pattern) {
                return (
                    Category::Productivity,
                    0.85,
                    Some(format!("productivity_app:{pattern}")),
                );
            }
        }
        for pattern in rules::NON_ACADEMIC_APPS {
            if app.contains(pattern) {
                return (
                    Category::NonAcademic,
                    0.85,
                    Some(format!("non_academic_app:{pattern}")),
                );
            }
        }
        for pattern in rules::NEUTRAL_APPS {
            if app.contains(pattern) {
                return (
                    Category::Neutral,
                    0.70,
                    Some(format!("neutral_app:{pattern}")),
                );
            }
        }
    }

    if rules::ACADEMIC_WINDOW_KEYWORDS
        .iter()
        .any(|kw| window_title.contains(kw))
    {
        return (
            Category::Academic,
            0.65,
            Some("academic_window_title".to_string()),
        );
    }
    if rules::PRODUCTIVITY_WINDOW_KEYWORDS
        .iter()
        .any(|kw| window_title.contains(kw))
    {
        return (
            Category::Productivity,
            0.60,
            Some("productivity_window_title".to_string()),
        );
    }
    if rules::NON_ACADEMIC_WINDOW_KEYWORDS
        .iter()
        .any(|kw| window_title.contains(kw))
    {
        return (
            Category::NonAcademic,
            0.65,
            Some("non_academic_window_title".to_string()),
        );
    }

    (Category::Neutral, 0.50, Some("unknown_app".to_string()))
}

/// Strip a file-extension suffix and lowercase, so `Steam.exe` and `steam`
/// match the same rules. Only known launcher extensions are stripped to
/// avoid mangling names like `battle.net`.
fn normalize_app_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    for ext in [".exe", ".app", ".lnk"] {
        if let Some(stripped) = lowered.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    lowered
}

fn classify_youtube(context: &YouTubeContext) -> (Category, f64) {
    if context.is_search == Some(true) {
        // A YouTube search could still turn academic.
        return (Category::Neutral, 0.60);
    }

    let title = context
        .title_for_classification
        .as_deref()
        .unwrap_or("")
        .to_lowercase();

    if rules::YOUTUBE_EDU_KEYWORDS.iter().any(|kw| title.contains(kw)) {
        return (Category::Academic, 0.70);
    }
    if rules::YOUTUBE_ENTERTAINMENT_KEYWORDS
        .iter()
        .any(|kw| title.contains(kw))
    {
        return (Category::NonAcademic, 0.75);
    }

    // YouTube defaults to entertainment.
    (Category::NonAcademic, 0.60)
}

fn classify_google(context: &GoogleContext, current: Category) -> (Category, f64) {
    if context.is_scholar == Some(true) {
        (Category::Academic, 0.95)
    } else if context.is_classroom == Some(true) {
        (Category::Academic, 0.90)
    } else if context.is_docs == Some(true) || context.is_drive == Some(true) {
        (Category::Productivity, 0.75)
    } else if context.is_search == Some(true) {
        (Category::Neutral, 0.55)
    } else {
        (current, 0.60)
    }
}
