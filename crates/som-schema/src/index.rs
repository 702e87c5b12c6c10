//! Identity value lookup

use std::collections::HashMap;

use som_ifc::Value;

use crate::model::{Schema, SchemaObject};

/// Maps every object's identity value to the object.
///
/// Built once per batch and shared read-only by all checks of that batch.
#[derive(Debug, Clone)]
pub struct IdentifierIndex<'s> {
    objects: HashMap<&'s str, &'s SchemaObject>,
}

impl<'s> IdentifierIndex<'s> {
    pub fn build(schema: &'s Schema) -> Self {
        let objects = schema
            .objects
            .iter()
            .map(|o| (o.ident_value.as_str(), o))
            .collect();
        Self { objects }
    }

    pub fn get(&self, ident_value: &str) -> Option<&'s SchemaObject> {
        self.objects.get(ident_value).copied()
    }

    /// Resolve a property value; non-text values match by their rendered text.
    pub fn resolve(&self, value: &Value) -> Option<&'s SchemaObject> {
        match value {
            Value::Text(text) => self.get(text),
            Value::Null => None,
            other => self.get(&other.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
