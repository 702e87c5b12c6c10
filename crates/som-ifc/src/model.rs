//! In-memory model view consumed by the checker

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ObjectClass, classify};
use crate::value::Value;
use crate::{Error, Result};

/// STEP instance id (`#42`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element or group of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: EntityId,
    /// IFC GlobalId
    pub guid: String,
    pub name: Option<String>,
    /// Upper-case entity type, e.g. `IFCWALL`
    pub ifc_type: String,
    pub class: ObjectClass,
}

/// Attribute name -> value
pub type PropertySet = BTreeMap<String, Value>;

/// Property set name -> attributes
pub type PropertySets = BTreeMap<String, PropertySet>;

/// Read-only view of an IFC model.
///
/// Only elements and groups are kept as objects. Relationships are stored in
/// both directions so that membership lookups are O(1) per object.
#[derive(Debug, Clone, Default)]
pub struct IfcModel {
    objects: BTreeMap<EntityId, ModelObject>,
    property_sets: HashMap<EntityId, PropertySets>,
    /// member -> groups it is assigned to
    assignments: HashMap<EntityId, Vec<EntityId>>,
    /// group -> its members
    members: HashMap<EntityId, Vec<EntityId>>,
}

impl IfcModel {
    /// Read and decode an IFC file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let model = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            objects = model.objects.len(),
            "Opened IFC model"
        );
        Ok(model)
    }

    /// Decode IFC file content.
    pub fn parse(content: &str) -> Result<Self> {
        crate::decoder::decode(content)
    }

    pub fn object(&self, id: EntityId) -> Option<&ModelObject> {
        self.objects.get(&id)
    }

    /// All elements and groups in instance id order
    pub fn objects(&self) -> impl Iterator<Item = &ModelObject> {
        self.objects.values()
    }

    pub fn elements(&self) -> impl Iterator<Item = &ModelObject> {
        self.objects_of(ObjectClass::Element)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ModelObject> {
        self.objects_of(ObjectClass::Group)
    }

    fn objects_of(&self, class: ObjectClass) -> impl Iterator<Item = &ModelObject> {
        self.objects.values().filter(move |o| o.class == class)
    }

    /// Groups that are not assigned to any other group
    pub fn root_groups(&self) -> Vec<EntityId> {
        self.groups()
            .filter(|g| self.group_assignments(g.id).is_empty())
            .map(|g| g.id)
            .collect()
    }

    pub fn property_sets(&self, id: EntityId) -> Option<&PropertySets> {
        self.property_sets.get(&id)
    }

    pub fn property_set(&self, id: EntityId, name: &str) -> Option<&PropertySet> {
        self.property_sets.get(&id).and_then(|sets| sets.get(name))
    }

    /// Groups the object is assigned to
    pub fn group_assignments(&self, id: EntityId) -> &[EntityId] {
        self.assignments.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct members of a group
    pub fn group_members(&self, id: EntityId) -> &[EntityId] {
        self.members.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn insert_object(&mut self, object: ModelObject) {
        self.objects.insert(object.id, object);
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Merge attributes into a property set, creating it if needed.
    pub(crate) fn merge_property_set(&mut self, id: EntityId, name: &str, attributes: PropertySet) {
        self.property_sets
            .entry(id)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .extend(attributes);
    }

    pub(crate) fn assign(&mut self, group: EntityId, member: EntityId) {
        let groups = self.assignments.entry(member).or_default();
        if groups.contains(&group) {
            return;
        }
        groups.push(group);
        self.members.entry(group).or_default().push(member);
    }
}

/// Programmatic construction of models, mostly for tests and tooling.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: IfcModel,
    next_id: u32,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object of any IFC type; its class follows from the type name.
    pub fn object(&mut self, guid: impl Into<String>, ifc_type: &str) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        let ifc_type = ifc_type.to_ascii_uppercase();
        self.model.insert_object(ModelObject {
            id,
            guid: guid.into(),
            name: None,
            class: classify(&ifc_type),
            ifc_type,
        });
        id
    }

    pub fn element(&mut self, guid: impl Into<String>, ifc_type: &str) -> EntityId {
        self.object(guid, ifc_type)
    }

    /// Add an `IFCGROUP`.
    pub fn group(&mut self, guid: impl Into<String>) -> EntityId {
        self.object(guid, "IFCGROUP")
    }

    pub fn name(&mut self, id: EntityId, name: impl Into<String>) -> &mut Self {
        if let Some(object) = self.model.objects.get_mut(&id) {
            object.name = Some(name.into());
        }
        self
    }

    /// Set one property value, creating the property set if needed.
    pub fn property(
        &mut self,
        id: EntityId,
        pset: &str,
        attribute: &str,
        value: impl Into<Value>,
    ) -> &mut Self {
        let mut attributes = PropertySet::new();
        attributes.insert(attribute.to_string(), value.into());
        self.model.merge_property_set(id, pset, attributes);
        self
    }

    /// Add an empty property set.
    pub fn property_set(&mut self, id: EntityId, pset: &str) -> &mut Self {
        self.model.merge_property_set(id, pset, PropertySet::new());
        self
    }

    /// Assign members to a group.
    pub fn assign(&mut self, group: EntityId, members: &[EntityId]) -> &mut Self {
        for &member in members {
            self.model.assign(group, member);
        }
        self
    }

    pub fn build(self) -> IfcModel {
        self.model
    }
}
