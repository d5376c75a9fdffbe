//! Report registry
//!
//! Maps a descriptor's `kind` to a factory that rebuilds the report from its
//! stored arguments. Built once at startup and shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::definition::{Report, ReportDefinition};
use super::descriptor::ReportDescriptor;
use super::error::ReportError;

pub type ReportFactory =
    Arc<dyn Fn(&Value) -> Result<Arc<dyn Report>, ReportError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ReportRegistry {
    factories: HashMap<String, ReportFactory>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `kind`, replacing any previous one
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Report>, ReportError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        tracing::debug!(kind = %kind, "Report kind registered");
        self.factories.insert(kind, Arc::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn create(&self, kind: &str, arguments: &Value) -> Result<Arc<dyn Report>, ReportError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ReportError::UnknownKind(kind.to_string()))?;
        factory(arguments)
    }

    /// Rebuild the live definition captured in `descriptor`
    pub fn reconstruct(&self, descriptor: &ReportDescriptor) -> Result<ReportDefinition, ReportError> {
        let report = self.create(&descriptor.kind, &descriptor.arguments)?;
        Ok(ReportDefinition::restore(report, descriptor))
    }
}

impl std::fmt::Debug for ReportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExportSettings;
    use crate::filter::Filter;
    use crate::query::{MemoryQuery, QueryError, QuerySource};
    use serde_json::json;

    struct Greeting {
        name: String,
    }

    impl Report for Greeting {
        fn kind(&self) -> &str {
            "greeting"
        }

        fn arguments(&self) -> Value {
            json!({"name": self.name})
        }

        fn query(&self) -> Result<Box<dyn QuerySource>, QueryError> {
            Ok(Box::new(MemoryQuery::new("greetings", vec![])))
        }

        fn filename(&self) -> String {
            format!("{}.csv", self.name)
        }
    }

    fn registry() -> ReportRegistry {
        let mut registry = ReportRegistry::new();
        registry.register("greeting", |args: &Value| {
            let name = args
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ReportError::InvalidArguments {
                    kind: "greeting".to_string(),
                    reason: "missing name".to_string(),
                })?;
            Ok(Arc::new(Greeting {
                name: name.to_string(),
            }) as Arc<dyn Report>)
        });
        registry
    }

    #[test]
    fn test_reconstruct_from_descriptor() {
        let settings = ExportSettings::default();
        let original = ReportDefinition::new(Greeting {
            name: "hello".to_string(),
        })
        .add_filter(Filter::equals("lang", "en").unwrap())
        .all_at_once();
        let descriptor = original.descriptor(&settings);

        let rebuilt = registry().reconstruct(&descriptor).unwrap();
        assert_eq!(rebuilt.descriptor(&settings), descriptor);
        assert_eq!(rebuilt.filename(), "hello.csv");
    }

    #[test]
    fn test_unknown_kind() {
        let err = registry().create("sales", &Value::Null).err().unwrap();
        assert!(matches!(err, ReportError::UnknownKind(kind) if kind == "sales"));
    }

    #[test]
    fn test_invalid_arguments() {
        let err = registry().create("greeting", &json!({})).err().unwrap();
        assert!(matches!(err, ReportError::InvalidArguments { .. }));
    }

    #[test]
    fn test_kinds() {
        let registry = registry();
        assert!(registry.contains("greeting"));
        assert_eq!(registry.kinds(), vec!["greeting"]);
    }
}
