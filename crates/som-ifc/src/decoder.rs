use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::model::{EntityId, IfcModel, ModelObject, PropertySet};
use crate::scanner::data_statements;
use crate::tokenizer::{AttributeValue, RawEntity, parse_entity};
use crate::types::{ObjectClass, classify, is_type_object};
use crate::value::Value;
use crate::{Error, Result};

// Attribute positions shared by all IfcRoot subtypes
const GLOBAL_ID: usize = 0;
const NAME: usize = 2;

/// Decode file content into the model view.
pub(crate) fn decode(content: &str) -> Result<IfcModel> {
    let statements = data_statements(content)?;

    let mut entities: HashMap<u32, RawEntity> = HashMap::with_capacity(statements.len());
    let mut skipped = 0usize;
    for statement in &statements {
        let text = statement.text.as_ref();
        if is_complex_instance(text) {
            trace!(offset = statement.offset, "Skipping complex entity instance");
            skipped += 1;
            continue;
        }
        match parse_entity(text) {
            Ok(entity) => {
                let id = entity.id;
                if entities.insert(id, entity).is_some() {
                    return Err(Error::entity_parse(id, "duplicate instance id"));
                }
            }
            Err(message) => {
                warn!(offset = statement.offset, %message, "Skipping unparseable entity");
                skipped += 1;
            }
        }
    }

    let mut model = IfcModel::default();
    collect_objects(&entities, &mut model)?;
    apply_type_property_sets(&entities, &mut model);
    apply_occurrence_property_sets(&entities, &mut model);
    apply_group_assignments(&entities, &mut model);

    debug!(
        entities = entities.len(),
        objects = model.len(),
        skipped,
        "Decoded DATA section"
    );
    Ok(model)
}

/// `#1=(IFCA(...)IFCB(...))` style instances carry no element or group data.
fn is_complex_instance(text: &str) -> bool {
    text.split_once('=')
        .is_some_and(|(_, rest)| rest.trim_start().starts_with('('))
}

fn collect_objects(entities: &HashMap<u32, RawEntity>, model: &mut IfcModel) -> Result<()> {
    for entity in entities.values() {
        let class = classify(&entity.type_name);
        if class == ObjectClass::Other {
            continue;
        }
        let guid = entity
            .get_str(GLOBAL_ID)
            .filter(|g| !g.is_empty())
            .ok_or_else(|| Error::entity_parse(entity.id, "missing GlobalId"))?;
        model.insert_object(ModelObject {
            id: EntityId(entity.id),
            guid: guid.to_string(),
            name: entity.get_str(NAME).map(str::to_string),
            ifc_type: entity.type_name.clone(),
            class,
        });
    }
    Ok(())
}

/// IfcRelDefinesByType: RelatedObjects (4), RelatingType (5).
/// The type object lists its HasPropertySets at index 5.
fn apply_type_property_sets(entities: &HashMap<u32, RawEntity>, model: &mut IfcModel) {
    for rel in entities.values().filter(|e| e.type_name == "IFCRELDEFINESBYTYPE") {
        let Some(type_object) = rel.get_ref(5).and_then(|id| entities.get(&id)) else {
            continue;
        };
        if !is_type_object(&type_object.type_name) {
            trace!(rel = rel.id, ty = %type_object.type_name, "RelatingType is not a type object");
            continue;
        }
        let definitions: Vec<(String, PropertySet)> = type_object
            .get_refs(5)
            .into_iter()
            .filter_map(|id| property_definition(entities, id))
            .collect();
        for object in rel.get_refs(4) {
            let object = EntityId(object);
            if !model.contains(object) {
                continue;
            }
            for (name, attributes) in &definitions {
                model.merge_property_set(object, name, attributes.clone());
            }
        }
    }
}

/// IfcRelDefinesByProperties: RelatedObjects (4), RelatingPropertyDefinition (5).
fn apply_occurrence_property_sets(entities: &HashMap<u32, RawEntity>, model: &mut IfcModel) {
    let mut rels: Vec<&RawEntity> = entities
        .values()
        .filter(|e| e.type_name == "IFCRELDEFINESBYPROPERTIES")
        .collect();
    // later relationships win on conflicting values
    rels.sort_by_key(|rel| rel.id);

    for rel in rels {
        let definitions: Vec<(String, PropertySet)> = rel
            .get_refs(5)
            .into_iter()
            .filter_map(|id| property_definition(entities, id))
            .collect();
        for object in rel.get_refs(4) {
            let object = EntityId(object);
            if !model.contains(object) {
                continue;
            }
            for (name, attributes) in &definitions {
                model.merge_property_set(object, name, attributes.clone());
            }
        }
    }
}

/// IfcRelAssignsToGroup: RelatedObjects (4), RelatingGroup (6).
fn apply_group_assignments(entities: &HashMap<u32, RawEntity>, model: &mut IfcModel) {
    let mut rels: Vec<&RawEntity> = entities
        .values()
        .filter(|e| {
            e.type_name == "IFCRELASSIGNSTOGROUP" || e.type_name == "IFCRELASSIGNSTOGROUPBYFACTOR"
        })
        .collect();
    rels.sort_by_key(|rel| rel.id);

    for rel in rels {
        let Some(group) = rel.get_ref(6) else {
            trace!(rel = rel.id, "Group assignment without RelatingGroup");
            continue;
        };
        for member in rel.get_refs(4) {
            model.assign(EntityId(group), EntityId(member));
        }
    }
}

/// Decode an IfcPropertySet or IfcElementQuantity into its name and values.
fn property_definition(
    entities: &HashMap<u32, RawEntity>,
    id: u32,
) -> Option<(String, PropertySet)> {
    let definition = entities.get(&id)?;
    let name = definition.get_str(NAME)?.to_string();

    let children = match definition.type_name.as_str() {
        // HasProperties
        "IFCPROPERTYSET" => definition.get_refs(4),
        // Quantities
        "IFCELEMENTQUANTITY" => definition.get_refs(5),
        _ => return None,
    };

    let attributes = children
        .into_iter()
        .filter_map(|child| entities.get(&child))
        .filter_map(property_value)
        .collect();
    Some((name, attributes))
}

/// Name and value of a single property or quantity.
fn property_value(entity: &RawEntity) -> Option<(String, Value)> {
    let name = entity.get_str(0)?.to_string();
    let value = match entity.type_name.as_str() {
        "IFCPROPERTYSINGLEVALUE" => entity.get(2).map_or(Value::Null, to_value),
        "IFCPROPERTYENUMERATEDVALUE" | "IFCPROPERTYLISTVALUE" => {
            entity.get(2).map_or(Value::Null, collapse_list)
        }
        "IFCQUANTITYLENGTH" | "IFCQUANTITYAREA" | "IFCQUANTITYVOLUME" | "IFCQUANTITYCOUNT"
        | "IFCQUANTITYWEIGHT" | "IFCQUANTITYTIME" | "IFCQUANTITYNUMBER" => {
            entity.get(3).map_or(Value::Null, to_value)
        }
        _ => return None,
    };
    Some((name, value))
}

/// A one-element list is its element; longer lists are joined as text.
fn collapse_list(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::List(items) if items.len() == 1 => to_value(&items[0]),
        AttributeValue::List(items) if items.is_empty() => Value::Null,
        AttributeValue::List(items) => Value::Text(
            items
                .iter()
                .map(|item| to_value(item).to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => to_value(other),
    }
}

fn to_value(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::String(s) => Value::Text(s.clone()),
        AttributeValue::Integer(i) => Value::Integer(*i),
        AttributeValue::Float(f) => Value::Real(*f),
        AttributeValue::Enum(e) => match e.as_str() {
            "T" | "TRUE" => Value::Boolean(true),
            "F" | "FALSE" => Value::Boolean(false),
            "U" | "UNKNOWN" => Value::Null,
            other => Value::Text(other.to_string()),
        },
        AttributeValue::TypedValue(_, args) if args.len() == 1 => to_value(&args[0]),
        AttributeValue::TypedValue(..) => Value::Null,
        AttributeValue::List(_) => collapse_list(attribute),
        AttributeValue::EntityRef(_) | AttributeValue::Null | AttributeValue::Derived => {
            Value::Null
        }
    }
}
