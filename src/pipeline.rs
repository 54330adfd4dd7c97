//! Dependency-ordered component execution.

use std::collections::HashSet;
use std::sync::Arc;

use log::warn;
use serde_json::{Map, Value};

use crate::components::Component;
use crate::registry::ComponentRegistry;

/// Key under which the original input is kept in the results map.
pub const INPUT_KEY: &str = "input";

/// Runs components in dependency order, threading each output into the
/// inputs of its dependents.
pub struct Pipeline {
    registry: Arc<ComponentRegistry>,
}

impl Pipeline {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    /// Run the pipeline starting from `start`.
    ///
    /// Dependencies execute before their dependents. A failing component is
    /// recorded under `{name}_error` and does not stop independent
    /// components from running. When `stop_after` is given, execution halts
    /// right after that component finishes, whether it succeeded or not.
    /// The returned map always carries the original input under
    /// [`INPUT_KEY`].
    pub fn run(
        &self,
        start: &str,
        input: &Value,
        stop_after: Option<&str>,
    ) -> Map<String, Value> {
        let mut results = Map::new();
        results.insert(INPUT_KEY.to_string(), input.clone());

        for name in self.resolve_order(start) {
            let Some(component) = self.registry.get(&name) else {
                continue;
            };

            let component_input = build_input(component.as_ref(), input, &results);

            match component.process(&component_input) {
                Ok(output) => {
                    results.insert(name.clone(), output);
                }
                Err(err) => {
                    warn!("Pipeline error in {name}: {err:#}");
                    results.insert(format!("{name}_error"), Value::String(err.to_string()));
                }
            }

            if stop_after == Some(name.as_str()) {
                break;
            }
        }

        results
    }

    /// Depth-first post-order over the dependency graph: dependencies come
    /// before the components that declared them. The visited set stops
    /// reprocessing of shared dependencies; it does not detect cycles, so a
    /// circular declaration would recurse without terminating.
    fn resolve_order(&self, start: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.visit(start, &mut visited, &mut order);
        order
    }

    fn visit(&self, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }

        if let Some(component) = self.registry.get(name) {
            for dep in component.dependencies() {
                self.visit(dep, visited, order);
            }
            order.push(name.to_string());
        }
    }
}

/// A component's input is the original input merged with the outputs of its
/// already-executed dependencies, keyed by dependency name.
fn build_input(component: &dyn Component, original: &Value, results: &Map<String, Value>) -> Value {
    let mut input = match original {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    for dep in component.dependencies() {
        if let Some(output) = results.get(*dep) {
            input.insert((*dep).to_string(), output.clone());
        }
    }

    Value::Object(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use serde_json::json;

    struct TestComponent {
        name: &'static str,
        deps: Vec<&'static str>,
        fail: bool,
    }

    impl TestComponent {
        fn new(name: &'static str, deps: Vec<&'static str>) -> Self {
            Self {
                name,
                deps,
                fail: false,
            }
        }

        fn failing(name: &'static str, deps: Vec<&'static str>) -> Self {
            Self {
                name,
                deps,
                fail: true,
            }
        }
    }

    impl Component for TestComponent {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn dependencies(&self) -> &[&str] {
            &self.deps
        }

        fn initialize(&self, _config: &Value) -> Result<()> {
            Ok(())
        }

        fn process(&self, input: &Value) -> Result<Value> {
            if self.fail {
                bail!("{} blew up", self.name);
            }
            // Echo back which keys were visible, so tests can check what
            // was merged into this component's input.
            let keys: Vec<String> = input
                .as_object()
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            Ok(json!({ "ran": self.name, "saw": keys }))
        }

        fn status(&self) -> Value {
            json!({ "name": self.name, "version": "1.0.0", "initialized": true })
        }
    }

    fn registry_with(components: Vec<TestComponent>) -> Arc<ComponentRegistry> {
        let registry = Arc::new(ComponentRegistry::new());
        for component in components {
            registry.register(Arc::new(component));
        }
        registry
    }

    #[test]
    fn dependencies_run_before_dependents() {
        let registry = registry_with(vec![
            TestComponent::new("a", vec![]),
            TestComponent::new("b", vec!["a"]),
            TestComponent::new("c", vec!["a", "b"]),
        ]);
        let pipeline = Pipeline::new(registry);

        let order = pipeline.resolve_order("c");
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn transitive_dependencies_are_ordered() {
        let registry = registry_with(vec![
            TestComponent::new("root", vec![]),
            TestComponent::new("mid", vec!["root"]),
            TestComponent::new("top", vec!["mid"]),
        ]);
        let pipeline = Pipeline::new(registry);

        let order = pipeline.resolve_order("top");
        assert_eq!(order, vec!["root", "mid", "top"]);
    }

    #[test]
    fn results_include_original_input() {
        let registry = registry_with(vec![TestComponent::new("a", vec![])]);
        let pipeline = Pipeline::new(registry);

        let results = pipeline.run("a", &json!({ "domain": "example.org" }), None);
        assert_eq!(results[INPUT_KEY], json!({ "domain": "example.org" }));
        assert!(results.contains_key("a"));
    }

    #[test]
    fn dependency_outputs_are_merged_into_inputs() {
        let registry = registry_with(vec![
            TestComponent::new("a", vec![]),
            TestComponent::new("b", vec!["a"]),
        ]);
        let pipeline = Pipeline::new(registry);

        let results = pipeline.run("b", &json!({ "x": 1 }), None);
        let saw = results["b"]["saw"].as_array().unwrap();
        assert!(saw.contains(&json!("x")));
        assert!(saw.contains(&json!("a")));
    }

    #[test]
    fn failure_does_not_abort_siblings() {
        let registry = registry_with(vec![
            TestComponent::failing("a", vec![]),
            TestComponent::new("b", vec![]),
            TestComponent::new("c", vec!["a", "b"]),
        ]);
        let pipeline = Pipeline::new(registry);

        let results = pipeline.run("c", &json!({}), None);

        assert_eq!(results["a_error"], json!("a blew up"));
        assert!(results.contains_key("b"));
        assert!(results.contains_key("c"));
        assert!(!results.contains_key("a"));
    }

    #[test]
    fn stop_after_halts_execution() {
        let registry = registry_with(vec![
            TestComponent::new("a", vec![]),
            TestComponent::new("b", vec!["a"]),
            TestComponent::new("c", vec!["b"]),
        ]);
        let pipeline = Pipeline::new(registry);

        let results = pipeline.run("c", &json!({}), Some("b"));

        assert!(results.contains_key("a"));
        assert!(results.contains_key("b"));
        assert!(!results.contains_key("c"));
    }

    #[test]
    fn unregistered_components_are_skipped() {
        let registry = registry_with(vec![TestComponent::new("a", vec![])]);
        let pipeline = Pipeline::new(registry);

        let results = pipeline.run("ghost", &json!({}), None);
        assert_eq!(results.len(), 1); // input only
    }
}
