//! Issue model

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a conformance violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    NoGroupMembership,
    MissingIdentificationPset,
    MissingIdentificationAttribute,
    UnknownIdentifierValue,
    MissingPropertySet,
    MissingAttribute,
    ValueOutOfRange,
    ValueNotInList,
    ValueFormatMismatch,
    DuplicateSubgroupIdentifier,
    RepetitiveGroup,
    IllegalParentGroup,
    EmptyGroup,
    CyclicGroupStructure,
}

impl IssueKind {
    pub const ALL: [IssueKind; 14] = [
        IssueKind::NoGroupMembership,
        IssueKind::MissingIdentificationPset,
        IssueKind::MissingIdentificationAttribute,
        IssueKind::UnknownIdentifierValue,
        IssueKind::MissingPropertySet,
        IssueKind::MissingAttribute,
        IssueKind::ValueOutOfRange,
        IssueKind::ValueNotInList,
        IssueKind::ValueFormatMismatch,
        IssueKind::DuplicateSubgroupIdentifier,
        IssueKind::RepetitiveGroup,
        IssueKind::IllegalParentGroup,
        IssueKind::EmptyGroup,
        IssueKind::CyclicGroupStructure,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::NoGroupMembership => "no-group-membership",
            IssueKind::MissingIdentificationPset => "missing-identification-pset",
            IssueKind::MissingIdentificationAttribute => "missing-identification-attribute",
            IssueKind::UnknownIdentifierValue => "unknown-identifier-value",
            IssueKind::MissingPropertySet => "missing-property-set",
            IssueKind::MissingAttribute => "missing-attribute",
            IssueKind::ValueOutOfRange => "value-out-of-range",
            IssueKind::ValueNotInList => "value-not-in-list",
            IssueKind::ValueFormatMismatch => "value-format-mismatch",
            IssueKind::DuplicateSubgroupIdentifier => "duplicate-subgroup-identifier",
            IssueKind::RepetitiveGroup => "repetitive-group",
            IssueKind::IllegalParentGroup => "illegal-parent-group",
            IssueKind::EmptyGroup => "empty-group",
            IssueKind::CyclicGroupStructure => "cyclic-group-structure",
        }
    }

    /// Human readable summary used in reports
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            IssueKind::NoGroupMembership => "Entity is not assigned to any group",
            IssueKind::MissingIdentificationPset => "Identification property set is missing",
            IssueKind::MissingIdentificationAttribute => "Identification attribute is missing",
            IssueKind::UnknownIdentifierValue => "Identifier does not match any schema object",
            IssueKind::MissingPropertySet => "Required property set is missing",
            IssueKind::MissingAttribute => "Required attribute is missing",
            IssueKind::ValueOutOfRange => "Value is outside every allowed range",
            IssueKind::ValueNotInList => "Value is not one of the allowed values",
            IssueKind::ValueFormatMismatch => "Value matches none of the allowed formats",
            IssueKind::DuplicateSubgroupIdentifier => {
                "Subgroup identifier differs from its collector group"
            }
            IssueKind::RepetitiveGroup => "Several subgroups share the same identifier",
            IssueKind::IllegalParentGroup => "Group is nested in a parent the schema does not allow",
            IssueKind::EmptyGroup => "Group has neither subgroups nor elements",
            IssueKind::CyclicGroupStructure => "Group is reached more than once in the group structure",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown issue kind '{s}'"))
    }
}

/// Whether a checked entity is a model element or a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRole {
    Element,
    Group,
}

impl EntityRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityRole::Element => "Element",
            EntityRole::Group => "Group",
        }
    }
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Element" => Ok(EntityRole::Element),
            "Group" => Ok(EntityRole::Group),
            other => Err(format!("unknown entity role '{other}'")),
        }
    }
}

/// One conformance violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// GlobalId of the offending element or group
    pub guid: String,
    pub role: EntityRole,
    pub kind: IssueKind,
    pub property_set: Option<String>,
    pub attribute: Option<String>,
    /// Offending value, rendered as text
    pub value: Option<String>,
    pub detail: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        guid: impl Into<String>,
        role: EntityRole,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            role,
            kind,
            property_set: None,
            attribute: None,
            value: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn with_property_set(mut self, property_set: impl Into<String>) -> Self {
        self.property_set = Some(property_set.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Ledger entry for a processed element or group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub guid: String,
    pub name: Option<String>,
    pub ifc_type: String,
    /// Resolved identifier, empty when none could be read
    pub identifier: String,
}

/// Issues and entity records produced while checking one model
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub issues: Vec<Issue>,
    pub entities: Vec<EntityRecord>,
    recorded: HashSet<String>,
}

impl CheckReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Record an entity; later records for the same GlobalId are ignored.
    pub fn record_entity(&mut self, record: EntityRecord) {
        if self.recorded.insert(record.guid.clone()) {
            self.entities.push(record);
        }
    }

    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn issues_for<'a>(&'a self, guid: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues.iter().filter(move |i| i.guid == guid)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip_through_from_str() {
        for kind in IssueKind::ALL {
            assert_eq!(kind.as_str().parse::<IssueKind>(), Ok(kind));
        }
        assert!("no-such-kind".parse::<IssueKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&IssueKind::IllegalParentGroup).unwrap();
        assert_eq!(json, "\"illegal-parent-group\"");
    }

    #[test]
    fn test_entities_recorded_once() {
        let mut report = CheckReport::new();
        let record = EntityRecord {
            guid: "g".to_string(),
            name: None,
            ifc_type: "IFCWALL".to_string(),
            identifier: "A".to_string(),
        };
        report.record_entity(record.clone());
        report.record_entity(EntityRecord {
            identifier: "B".to_string(),
            ..record
        });
        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.entities[0].identifier, "A");
    }

    #[test]
    fn test_issue_builder() {
        let issue = Issue::new(IssueKind::ValueNotInList, "g", EntityRole::Element, "bad")
            .with_property_set("P")
            .with_attribute("A")
            .with_value("x");
        assert_eq!(issue.property_set.as_deref(), Some("P"));
        assert_eq!(issue.attribute.as_deref(), Some("A"));
        assert_eq!(issue.value.as_deref(), Some("x"));
        assert_eq!(issue.role.to_string(), "Element");
        assert_eq!("Group".parse::<EntityRole>(), Ok(EntityRole::Group));
    }
}
