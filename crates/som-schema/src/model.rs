//! Schema model definitions

use regex::Regex;
use serde::{Deserialize, Serialize};
use som_ifc::Value;

/// A complete classification schema
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: String,
    pub version: Option<String>,
    pub objects: Vec<SchemaObject>,
    pub aggregations: Vec<AggregationNode>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_objects(mut self, objects: Vec<SchemaObject>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn with_aggregations(mut self, nodes: Vec<AggregationNode>) -> Self {
        self.aggregations.extend(nodes);
        self
    }

    /// Find an object by identity value
    pub fn object(&self, ident_value: &str) -> Option<&SchemaObject> {
        self.objects.iter().find(|o| o.ident_value == ident_value)
    }

    /// Find an aggregation node by id
    pub fn aggregation(&self, id: &str) -> Option<&AggregationNode> {
        self.aggregations.iter().find(|n| n.id == id)
    }

    /// Aggregation nodes representing the given object, in declaration order
    pub fn aggregations_of<'a>(
        &'a self,
        ident_value: &'a str,
    ) -> impl Iterator<Item = &'a AggregationNode> + 'a {
        self.aggregations
            .iter()
            .filter(move |n| n.object == ident_value)
    }

    /// Whether any object declares `attribute` inside `property_set`
    pub fn declares_attribute(&self, property_set: &str, attribute: &str) -> bool {
        self.objects.iter().any(|o| {
            o.property_set(property_set)
                .is_some_and(|p| p.attribute(attribute).is_some())
        })
    }
}

/// A building element class of the schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaObject {
    /// Business key matched against the identification attribute
    pub ident_value: String,
    pub name: String,
    /// Identity value of the parent object
    pub parent: Option<String>,
    pub property_sets: Vec<SchemaPropertySet>,
}

impl SchemaObject {
    pub fn new(ident_value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ident_value: ident_value.into(),
            name: name.into(),
            parent: None,
            property_sets: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_property_set(mut self, property_set: SchemaPropertySet) -> Self {
        self.property_sets.push(property_set);
        self
    }

    pub fn property_set(&self, name: &str) -> Option<&SchemaPropertySet> {
        self.property_sets.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaPropertySet {
    pub name: String,
    pub attributes: Vec<SchemaAttribute>,
}

impl SchemaPropertySet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAttribute {
    pub name: String,
    pub rule: ValueRule,
}

impl SchemaAttribute {
    pub fn new(name: impl Into<String>, rule: ValueRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

/// Value rule of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum ValueRule {
    /// Allowed values; an empty list allows everything
    Enumeration(Vec<Value>),
    /// Inclusive numeric ranges, any one must contain the value
    Range(Vec<RangeBound>),
    /// Regex patterns, any one must match somewhere in the value
    Format(Vec<FormatPattern>),
}

impl ValueRule {
    pub fn kind(&self) -> &'static str {
        match self {
            ValueRule::Enumeration(_) => "enumeration",
            ValueRule::Range(_) => "range",
            ValueRule::Format(_) => "format",
        }
    }
}

/// Inclusive numeric range, stored with `min <= max`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBound {
    pub min: f64,
    pub max: f64,
}

impl RangeBound {
    /// Build a range from two bounds in any order.
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Compiled regex pattern with its source text
#[derive(Debug, Clone)]
pub struct FormatPattern {
    source: String,
    regex: Regex,
}

impl FormatPattern {
    pub fn new(pattern: impl Into<String>) -> std::result::Result<Self, regex::Error> {
        let source = pattern.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Unanchored search
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for FormatPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Kind of the edge from an aggregation node to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Aggregation,
    Inheritance,
    Both,
}

impl ConnectionKind {
    /// Inheritance-only edges are not nesting steps
    pub fn is_nesting(self) -> bool {
        self != ConnectionKind::Inheritance
    }
}

/// One occurrence of an object in the aggregation topology
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNode {
    pub id: String,
    /// Identity value of the object this node represents
    pub object: String,
    /// Parent node id
    pub parent: Option<String>,
    pub parent_connection: ConnectionKind,
}

impl AggregationNode {
    pub fn new(id: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: object.into(),
            parent: None,
            parent_connection: ConnectionKind::default(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>, connection: ConnectionKind) -> Self {
        self.parent = Some(parent.into());
        self.parent_connection = connection;
        self
    }
}
