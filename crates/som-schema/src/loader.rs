//! Schema loader for JSON and YAML project files

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use som_ifc::Value;
use tracing::{debug, info, trace};

use crate::aggregation::find_cycle;
use crate::model::{
    AggregationNode, ConnectionKind, FormatPattern, RangeBound, Schema, SchemaAttribute,
    SchemaObject, SchemaPropertySet, ValueRule,
};
use crate::{Error, Result};

/// Serializable schema format for loading from files
#[derive(Debug, Deserialize)]
struct SchemaFile {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    objects: Vec<ObjectFile>,
    #[serde(default)]
    aggregations: Vec<AggregationFile>,
}

#[derive(Debug, Deserialize)]
struct ObjectFile {
    ident_value: String,
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    property_sets: Vec<PropertySetFile>,
}

#[derive(Debug, Deserialize)]
struct PropertySetFile {
    name: String,
    #[serde(default)]
    attributes: Vec<AttributeFile>,
}

#[derive(Debug, Deserialize)]
struct AttributeFile {
    name: String,
    rule: RuleFile,
}

/// Unknown `kind` values are rejected while deserializing.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RuleFile {
    Enumeration {
        #[serde(default)]
        values: Vec<Value>,
    },
    Range {
        #[serde(default)]
        bounds: Vec<(Value, Value)>,
    },
    Format {
        #[serde(default)]
        patterns: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct AggregationFile {
    id: String,
    object: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    connection: ConnectionKind,
}

/// Loads schema project files and checks their references
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaLoader;

impl SchemaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a schema from a file; `.yaml`/`.yml` is read as YAML, anything
    /// else as JSON.
    pub fn load_from_file(&self, path: &Path) -> Result<Schema> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        let schema = if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.load_from_yaml(&content)?
        } else {
            self.load_from_json(&content)?
        };

        info!(
            schema = %schema.name,
            objects = schema.objects.len(),
            aggregations = schema.aggregations.len(),
            "Loaded schema from {}",
            path.display()
        );
        Ok(schema)
    }

    /// Load a schema from JSON string
    pub fn load_from_json(&self, json: &str) -> Result<Schema> {
        let schema_file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;

        self.convert_schema_file(schema_file)
    }

    /// Load a schema from YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Schema> {
        let schema_file: SchemaFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;

        self.convert_schema_file(schema_file)
    }

    fn convert_schema_file(&self, schema_file: SchemaFile) -> Result<Schema> {
        let objects = schema_file
            .objects
            .into_iter()
            .map(convert_object)
            .collect::<Result<Vec<_>>>()?;

        let aggregations = schema_file
            .aggregations
            .into_iter()
            .map(|a| AggregationNode {
                id: a.id,
                object: a.object,
                parent: a.parent,
                parent_connection: a.connection,
            })
            .collect();

        let schema = Schema {
            name: schema_file.name,
            version: schema_file.version,
            objects,
            aggregations,
        };
        validate_schema(&schema)?;
        Ok(schema)
    }
}

fn convert_object(object: ObjectFile) -> Result<SchemaObject> {
    let mut property_sets = Vec::with_capacity(object.property_sets.len());
    for pset in object.property_sets {
        let mut attributes = Vec::with_capacity(pset.attributes.len());
        for attribute in pset.attributes {
            let path = format!("{}.{}.{}", object.ident_value, pset.name, attribute.name);
            let rule = convert_rule(&path, attribute.rule)?;
            attributes.push(SchemaAttribute::new(attribute.name, rule));
        }
        property_sets.push(SchemaPropertySet {
            name: pset.name,
            attributes,
        });
    }

    Ok(SchemaObject {
        ident_value: object.ident_value,
        name: object.name,
        parent: object.parent,
        property_sets,
    })
}

fn convert_rule(path: &str, rule: RuleFile) -> Result<ValueRule> {
    match rule {
        RuleFile::Enumeration { values } => Ok(ValueRule::Enumeration(values)),
        RuleFile::Range { bounds } => {
            let ranges = bounds
                .iter()
                .map(|(a, b)| match (a.as_f64(), b.as_f64()) {
                    (Some(a), Some(b)) => Ok(RangeBound::new(a, b)),
                    _ => Err(Error::InvalidRange {
                        attribute: path.to_string(),
                        details: format!("non-numeric bound in [{a}, {b}]"),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ValueRule::Range(ranges))
        }
        RuleFile::Format { patterns } => {
            let compiled = patterns
                .into_iter()
                .map(|pattern| {
                    FormatPattern::new(pattern.clone()).map_err(|source| Error::InvalidPattern {
                        attribute: path.to_string(),
                        pattern,
                        source,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ValueRule::Format(compiled))
        }
    }
}

/// Check identity uniqueness, references and cycles.
pub fn validate_schema(schema: &Schema) -> Result<()> {
    let mut idents = HashSet::new();
    for object in &schema.objects {
        if !idents.insert(object.ident_value.as_str()) {
            return Err(Error::DuplicateIdentifier(object.ident_value.clone()));
        }
    }

    for object in &schema.objects {
        if let Some(parent) = &object.parent {
            if !idents.contains(parent.as_str()) {
                return Err(Error::UnknownReference(format!(
                    "parent '{parent}' of object '{}'",
                    object.ident_value
                )));
            }
        }
        let next = |ident: &str| schema.object(ident).and_then(|o| o.parent.as_deref());
        if let Some(chain) = find_cycle(&object.ident_value, next) {
            return Err(Error::CircularDependency(format!(
                "object parents {}",
                chain.join(" -> ")
            )));
        }
    }

    let mut node_ids = HashSet::new();
    for node in &schema.aggregations {
        if !node_ids.insert(node.id.as_str()) {
            return Err(Error::InvalidFormat(format!(
                "duplicate aggregation id '{}'",
                node.id
            )));
        }
        if !idents.contains(node.object.as_str()) {
            return Err(Error::UnknownReference(format!(
                "object '{}' of aggregation '{}'",
                node.object, node.id
            )));
        }
    }

    for node in &schema.aggregations {
        if let Some(parent) = &node.parent {
            if !node_ids.contains(parent.as_str()) {
                return Err(Error::UnknownReference(format!(
                    "parent '{parent}' of aggregation '{}'",
                    node.id
                )));
            }
        }
        let next = |id: &str| schema.aggregation(id).and_then(|n| n.parent.as_deref());
        if let Some(chain) = find_cycle(&node.id, next) {
            return Err(Error::CircularDependency(format!(
                "aggregations {}",
                chain.join(" -> ")
            )));
        }
    }

    debug!(schema = %schema.name, "Schema references validated");
    Ok(())
}
