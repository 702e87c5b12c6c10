//! Identifier resolution

use som_ifc::{EntityId, IfcModel, Value};
use som_schema::{IdentifierIndex, Schema, SchemaObject};

use crate::{Error, Result};

/// The (property set, attribute) pair holding an entity's identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationConfig {
    pub property_set: String,
    pub attribute: String,
}

impl IdentificationConfig {
    /// # Errors
    ///
    /// Returns [`Error::Config`] when either name is blank.
    pub fn new(property_set: impl Into<String>, attribute: impl Into<String>) -> Result<Self> {
        let config = Self {
            property_set: property_set.into().trim().to_string(),
            attribute: attribute.into().trim().to_string(),
        };
        if config.property_set.is_empty() {
            return Err(Error::Config(
                "identification property set name is empty".to_string(),
            ));
        }
        if config.attribute.is_empty() {
            return Err(Error::Config(
                "identification attribute name is empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Ensure the schema declares the identification attribute somewhere.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no schema object declares the pair.
    pub fn check_against(&self, schema: &Schema) -> Result<()> {
        if schema.declares_attribute(&self.property_set, &self.attribute) {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "no object of schema '{}' declares '{}.{}'",
                schema.name, self.property_set, self.attribute
            )))
        }
    }
}

/// Result of reading the identification attribute of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Identification<'m> {
    MissingPropertySet,
    /// Property set exists but the attribute is absent or unset
    MissingAttribute,
    Found(&'m Value),
}

impl<'m> Identification<'m> {
    #[must_use]
    pub fn value(self) -> Option<&'m Value> {
        match self {
            Identification::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Read the identification attribute of an entity.
#[must_use]
pub fn identify<'m>(
    model: &'m IfcModel,
    entity: EntityId,
    config: &IdentificationConfig,
) -> Identification<'m> {
    let Some(pset) = model.property_set(entity, &config.property_set) else {
        return Identification::MissingPropertySet;
    };
    match pset.get(&config.attribute) {
        Some(value) if !value.is_null() => Identification::Found(value),
        _ => Identification::MissingAttribute,
    }
}

/// Identifier value of an entity, absent when the pset or attribute is missing.
#[must_use]
pub fn resolve_identifier<'m>(
    model: &'m IfcModel,
    entity: EntityId,
    config: &IdentificationConfig,
) -> Option<&'m Value> {
    identify(model, entity, config).value()
}

/// Schema object for an identifier value.
#[must_use]
pub fn resolve_object<'s>(value: &Value, index: &IdentifierIndex<'s>) -> Option<&'s SchemaObject> {
    index.resolve(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use som_ifc::ModelBuilder;

    fn config() -> IdentificationConfig {
        IdentificationConfig::new("Identity", "Identifier").unwrap()
    }

    #[test]
    fn test_identify() {
        let mut builder = ModelBuilder::new();
        let found = builder.element("a", "IFCWALL");
        let no_pset = builder.element("b", "IFCWALL");
        let no_attr = builder.element("c", "IFCWALL");
        let unset = builder.element("d", "IFCWALL");
        builder
            .property(found, "Identity", "Identifier", "WAL")
            .property(no_attr, "Identity", "Other", "x")
            .property(unset, "Identity", "Identifier", Value::Null);
        let model = builder.build();

        assert_eq!(
            identify(&model, found, &config()),
            Identification::Found(&Value::from("WAL"))
        );
        assert_eq!(identify(&model, no_pset, &config()), Identification::MissingPropertySet);
        assert_eq!(identify(&model, no_attr, &config()), Identification::MissingAttribute);
        assert_eq!(identify(&model, unset, &config()), Identification::MissingAttribute);
        assert_eq!(resolve_identifier(&model, no_pset, &config()), None);
    }

    #[test]
    fn test_resolve_object() {
        let schema = Schema::new("S").with_objects(vec![SchemaObject::new("WAL", "Wall")]);
        let index = IdentifierIndex::build(&schema);
        assert_eq!(
            resolve_object(&Value::from("WAL"), &index).map(|o| o.name.as_str()),
            Some("Wall")
        );
        assert!(resolve_object(&Value::from("XYZ"), &index).is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(IdentificationConfig::new(" ", "Identifier").is_err());
        assert!(IdentificationConfig::new("Identity", "").is_err());

        let schema = Schema::new("S");
        let err = config().check_against(&schema).unwrap_err();
        assert!(err.to_string().contains("Identity.Identifier"));
    }
}
