//! Resource registry - resource type name to schema
//!
//! Built once at startup and handed to whoever needs it; there is no
//! global registration.

use crate::error::{ReconcileError, Result};
use crate::schema::ResourceSchema;
use std::collections::BTreeMap;

/// Known resource types
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    schemas: BTreeMap<String, ResourceSchema>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous one with the same type name
    pub fn register(&mut self, schema: ResourceSchema) -> &mut Self {
        self.schemas.insert(schema.type_name.clone(), schema);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, schema: ResourceSchema) -> Self {
        self.register(schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&ResourceSchema> {
        self.schemas.get(type_name)
    }

    /// Look up a schema, failing for unknown types
    pub fn schema(&self, type_name: &str) -> Result<&ResourceSchema> {
        self.get(type_name)
            .ok_or_else(|| ReconcileError::UnknownResourceType(type_name.to_string()))
    }

    /// Registered type names in sorted order
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = ResourceRegistry::new()
            .with(ResourceSchema::new("b_type", "B"))
            .with(ResourceSchema::new("a_type", "A"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.types().collect::<Vec<_>>(), vec!["a_type", "b_type"]);
        assert!(registry.schema("a_type").is_ok());
        assert!(matches!(
            registry.schema("missing"),
            Err(ReconcileError::UnknownResourceType(_))
        ));
    }
}
