//! Element checks

use som_ifc::{IfcModel, ModelObject, PropertySets};
use som_schema::{IdentifierIndex, Schema, SchemaObject};
use tracing::{debug, trace};

use crate::identifier::{IdentificationConfig, Identification, identify};
use crate::issue::{CheckReport, EntityRecord, EntityRole, Issue, IssueKind};
use crate::rules::{RuleResult, validate};

/// Checks model entities against a schema.
///
/// Holds only shared references; one checker serves a whole batch.
#[derive(Debug, Clone, Copy)]
pub struct Checker<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) index: &'a IdentifierIndex<'a>,
    pub(crate) identification: &'a IdentificationConfig,
}

impl<'a> Checker<'a> {
    #[must_use]
    pub fn new(
        schema: &'a Schema,
        index: &'a IdentifierIndex<'a>,
        identification: &'a IdentificationConfig,
    ) -> Self {
        Self {
            schema,
            index,
            identification,
        }
    }

    #[must_use]
    pub fn identification(&self) -> &IdentificationConfig {
        self.identification
    }

    /// Check one element (or a group acting as an element).
    ///
    /// The entity is recorded in the report exactly once, whatever the outcome.
    pub fn check_element(
        &self,
        model: &IfcModel,
        object: &ModelObject,
        role: EntityRole,
        report: &mut CheckReport,
    ) {
        let guid = object.guid.as_str();
        let config = self.identification;

        if model.group_assignments(object.id).is_empty() {
            report.add_issue(Issue::new(
                IssueKind::NoGroupMembership,
                guid,
                role,
                format!("{} is not assigned to any group", object.ifc_type),
            ));
        }

        let value = match identify(model, object.id, config) {
            Identification::MissingPropertySet => {
                report.add_issue(
                    Issue::new(
                        IssueKind::MissingIdentificationPset,
                        guid,
                        role,
                        format!("Property set '{}' is missing", config.property_set),
                    )
                    .with_property_set(&config.property_set),
                );
                report.record_entity(entity_record(object, String::new()));
                return;
            }
            Identification::MissingAttribute => {
                report.add_issue(
                    Issue::new(
                        IssueKind::MissingIdentificationAttribute,
                        guid,
                        role,
                        format!(
                            "Attribute '{}.{}' is missing",
                            config.property_set, config.attribute
                        ),
                    )
                    .with_property_set(&config.property_set)
                    .with_attribute(&config.attribute),
                );
                report.record_entity(entity_record(object, String::new()));
                return;
            }
            Identification::Found(value) => value,
        };

        let identifier = value.to_string();
        report.record_entity(entity_record(object, identifier.clone()));

        let Some(schema_object) = self.index.resolve(value) else {
            debug!(guid, %identifier, "Identifier not found in schema");
            report.add_issue(
                Issue::new(
                    IssueKind::UnknownIdentifierValue,
                    guid,
                    role,
                    format!("Identifier '{identifier}' matches no schema object"),
                )
                .with_property_set(&config.property_set)
                .with_attribute(&config.attribute)
                .with_value(identifier),
            );
            return;
        };

        let empty = PropertySets::new();
        let property_sets = model.property_sets(object.id).unwrap_or(&empty);
        check_properties(guid, role, property_sets, schema_object, report);
    }
}

/// Compare the entity's property sets with the ones the object declares.
fn check_properties(
    guid: &str,
    role: EntityRole,
    property_sets: &PropertySets,
    object: &SchemaObject,
    report: &mut CheckReport,
) {
    for declared in &object.property_sets {
        let Some(values) = property_sets.get(&declared.name) else {
            report.add_issue(
                Issue::new(
                    IssueKind::MissingPropertySet,
                    guid,
                    role,
                    format!(
                        "Property set '{}' required by '{}' is missing",
                        declared.name, object.ident_value
                    ),
                )
                .with_property_set(&declared.name),
            );
            continue;
        };

        for attribute in &declared.attributes {
            let value = match values.get(&attribute.name) {
                Some(value) if !value.is_null() => value,
                _ => {
                    report.add_issue(
                        Issue::new(
                            IssueKind::MissingAttribute,
                            guid,
                            role,
                            format!("Attribute '{}.{}' is missing", declared.name, attribute.name),
                        )
                        .with_property_set(&declared.name)
                        .with_attribute(&attribute.name),
                    );
                    continue;
                }
            };

            match validate(value, attribute) {
                RuleResult::Valid => {
                    trace!(guid, pset = %declared.name, attribute = %attribute.name, "Value ok");
                }
                RuleResult::Invalid { kind, message } => report.add_issue(
                    Issue::new(kind, guid, role, message)
                        .with_property_set(&declared.name)
                        .with_attribute(&attribute.name)
                        .with_value(value.to_string()),
                ),
            }
        }
    }
}

fn entity_record(object: &ModelObject, identifier: String) -> EntityRecord {
    EntityRecord {
        guid: object.guid.clone(),
        name: object.name.clone(),
        ifc_type: object.ifc_type.clone(),
        identifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use som_ifc::{ModelBuilder, Value};
    use som_schema::{RangeBound, SchemaAttribute, SchemaPropertySet, ValueRule};

    fn schema() -> Schema {
        Schema::new("S").with_objects(vec![
            SchemaObject::new("O1", "Object 1").with_property_set(
                SchemaPropertySet::new("P1").with_attribute(SchemaAttribute::new(
                    "A1",
                    ValueRule::Range(vec![RangeBound::new(0.0, 10.0)]),
                )),
            ),
        ])
    }

    fn config() -> IdentificationConfig {
        IdentificationConfig::new("Identity", "Identifier").unwrap()
    }

    fn check(builder: ModelBuilder, guid: &str) -> CheckReport {
        let model = builder.build();
        let schema = schema();
        let index = IdentifierIndex::build(&schema);
        let config = config();
        let checker = Checker::new(&schema, &index, &config);
        let mut report = CheckReport::new();
        let object = model.objects().find(|o| o.guid == guid).unwrap();
        checker.check_element(&model, object, EntityRole::Element, &mut report);
        report
    }

    fn grouped_element(value: impl Into<Value>) -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let element = builder.element("E1", "IFCWALL");
        builder
            .assign(group, &[element])
            .property(element, "Identity", "Identifier", "O1")
            .property(element, "P1", "A1", value);
        builder
    }

    #[test]
    fn test_value_in_range_has_no_issues() {
        let report = check(grouped_element(5), "E1");
        assert!(report.is_clean(), "{:?}", report.issues);
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.entities[0].identifier, "O1");
    }

    #[test]
    fn test_value_out_of_range() {
        let report = check(grouped_element(15), "E1");
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.kind, IssueKind::ValueOutOfRange);
        assert_eq!(issue.property_set.as_deref(), Some("P1"));
        assert_eq!(issue.attribute.as_deref(), Some("A1"));
        assert_eq!(issue.value.as_deref(), Some("15"));
    }

    #[test]
    fn test_ungrouped_element_still_checked() {
        let mut builder = ModelBuilder::new();
        let element = builder.element("E1", "IFCWALL");
        builder
            .property(element, "Identity", "Identifier", "O1")
            .property(element, "P1", "A1", 50);
        let report = check(builder, "E1");

        assert_eq!(report.count(IssueKind::NoGroupMembership), 1);
        assert_eq!(report.count(IssueKind::ValueOutOfRange), 1);
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn test_missing_identification_pset() {
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let element = builder.element("E1", "IFCWALL");
        builder.assign(group, &[element]);
        let report = check(builder, "E1");

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingIdentificationPset);
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.entities[0].identifier, "");
    }

    #[test]
    fn test_missing_identification_attribute() {
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let element = builder.element("E1", "IFCWALL");
        builder.assign(group, &[element]).property_set(element, "Identity");
        let report = check(builder, "E1");

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingIdentificationAttribute);
        assert_eq!(report.entities[0].identifier, "");
    }

    #[test]
    fn test_unknown_identifier() {
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let element = builder.element("E1", "IFCWALL");
        builder
            .assign(group, &[element])
            .property(element, "Identity", "Identifier", "NOPE");
        let report = check(builder, "E1");

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::UnknownIdentifierValue);
        assert_eq!(report.issues[0].value.as_deref(), Some("NOPE"));
        assert_eq!(report.entities[0].identifier, "NOPE");
    }

    #[test]
    fn test_missing_property_set_and_attribute() {
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let no_pset = builder.element("E1", "IFCWALL");
        let no_attr = builder.element("E2", "IFCWALL");
        builder
            .assign(group, &[no_pset, no_attr])
            .property(no_pset, "Identity", "Identifier", "O1")
            .property(no_attr, "Identity", "Identifier", "O1")
            .property(no_attr, "P1", "Other", 1);
        let model = builder.build();

        let schema = schema();
        let index = IdentifierIndex::build(&schema);
        let config = config();
        let checker = Checker::new(&schema, &index, &config);
        let mut report = CheckReport::new();
        for element in model.elements() {
            checker.check_element(&model, element, EntityRole::Element, &mut report);
        }

        let first: Vec<_> = report.issues_for("E1").map(|i| i.kind).collect();
        assert_eq!(first, vec![IssueKind::MissingPropertySet]);
        let second: Vec<_> = report.issues_for("E2").map(|i| i.kind).collect();
        assert_eq!(second, vec![IssueKind::MissingAttribute]);
        assert_eq!(report.entities.len(), 2);
    }
}
