//! Pluggable analysis components.
//!
//! Components are the building blocks of the activity analysis pipeline.
//! Each one handles a specific slice of the work (classification today;
//! procrastination detection, interventions and task breakdown later),
//! declares which components must run before it, and is reached through
//! the [`ComponentRegistry`](crate::registry::ComponentRegistry).

pub mod classifier;

use std::sync::Arc;

use anyhow::Result;
use log::info;
use serde_json::Value;

use crate::registry::ComponentRegistry;

/// Contract every analysis component implements.
pub trait Component: Send + Sync {
    /// Stable unique identifier, e.g. `"classification"`.
    fn name(&self) -> &str;

    /// Semantic version string, e.g. `"0.1.0-stub"`.
    fn version(&self) -> &str;

    /// Names of components that must run before this one. Empty for roots.
    /// Must never contain the component's own name.
    fn dependencies(&self) -> &[&str];

    /// One-time setup at startup: load rule tables or models and mark the
    /// component ready. Receives the component-specific config section.
    fn initialize(&self, config: &Value) -> Result<()>;

    /// Transform one unit of work. Fails if called before `initialize`;
    /// unparseable input degrades to a safe default output instead of
    /// erroring. No I/O in here.
    fn process(&self, input: &Value) -> Result<Value>;

    /// Health snapshot: at least name, version and the initialized flag,
    /// plus implementation-specific counters.
    fn status(&self) -> Value;
}

/// Construct, initialize and register the built-in components.
///
/// `config` is the per-component configuration map keyed by component name;
/// each component receives its own section (or an empty object).
pub fn load_all_components(registry: &ComponentRegistry, config: &Value) -> Result<()> {
    let classifier = classifier::ClassifierComponent::new();
    let section = config
        .get(classifier.name())
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    classifier.initialize(&section)?;
    registry.register(Arc::new(classifier));

    // Future components register here: procrastination, intervention,
    // task_breakdown.

    info!("Loaded {} component(s)", registry.get_all().len());
    Ok(())
}
