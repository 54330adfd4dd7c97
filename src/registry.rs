use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use log::info;
use serde_json::Value;

use crate::components::Component;

/// Lookup table for the analysis components active in this process.
///
/// Constructed once at startup and shared via `Arc`; components register
/// themselves here and can invoke each other by name. Callers only ever
/// receive shared handles, the registry keeps ownership of the table.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<dyn Component>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component, overwriting any previous registration under the
    /// same name.
    pub fn register(&self, component: Arc<dyn Component>) {
        let name = component.name().to_string();
        let version = component.version().to_string();
        self.components
            .write()
            .unwrap()
            .insert(name.clone(), component);
        info!("Registered component: {name} v{version}");
    }

    pub fn unregister(&self, name: &str) {
        if self.components.write().unwrap().remove(name).is_some() {
            info!("Unregistered component: {name}");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.read().unwrap().get(name).cloned()
    }

    /// Snapshot of the current table. Mutating the returned map does not
    /// touch the live registry.
    pub fn get_all(&self) -> HashMap<String, Arc<dyn Component>> {
        self.components.read().unwrap().clone()
    }

    /// Look up a component and run its `process` method.
    pub fn call(&self, name: &str, input: &Value) -> Result<Value> {
        let component = self
            .get(name)
            .ok_or_else(|| anyhow!("component '{name}' not found"))?;
        component.process(input)
    }

    pub fn get_all_status(&self) -> HashMap<String, Value> {
        self.get_all()
            .into_iter()
            .map(|(name, component)| (name, component.status()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoComponent {
        name: &'static str,
    }

    impl Component for EchoComponent {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn dependencies(&self) -> &[&str] {
            &[]
        }

        fn initialize(&self, _config: &Value) -> Result<()> {
            Ok(())
        }

        fn process(&self, input: &Value) -> Result<Value> {
            Ok(json!({ "echo": input.clone() }))
        }

        fn status(&self) -> Value {
            json!({ "name": self.name, "version": "1.0.0", "initialized": true })
        }
    }

    #[test]
    fn register_and_get() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(EchoComponent { name: "echo" }));

        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn register_overwrites_same_name() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(EchoComponent { name: "echo" }));
        registry.register(Arc::new(EchoComponent { name: "echo" }));

        assert_eq!(registry.get_all().len(), 1);
    }

    #[test]
    fn call_invokes_process() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(EchoComponent { name: "echo" }));

        let output = registry.call("echo", &json!({ "x": 1 })).unwrap();
        assert_eq!(output, json!({ "echo": { "x": 1 } }));
    }

    #[test]
    fn call_unknown_component_is_an_error() {
        let registry = ComponentRegistry::new();
        let err = registry.call("nope", &json!({})).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn get_all_returns_a_snapshot() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(EchoComponent { name: "echo" }));

        let mut snapshot = registry.get_all();
        snapshot.clear();

        assert!(registry.get("echo").is_some());
    }

    #[test]
    fn unregister_removes_component() {
        let registry = ComponentRegistry::new();
        registry.register(Arc::new(EchoComponent { name: "echo" }));
        registry.unregister("echo");

        assert!(registry.get("echo").is_none());
        assert!(registry.get_all_status().is_empty());
    }
}
