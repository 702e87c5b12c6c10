#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # som-validation
//!
//! Conformance checks of IFC models against a classification schema.
//!
//! Elements are identified through a configurable (property set, attribute)
//! pair, resolved to a schema object and checked against the property sets
//! and value rules that object declares. Groups are arranged into trees and
//! checked layer by layer: collector groups on even layers, real groups on
//! odd layers.
//!
//! ## Example Usage
//!
//! ```rust
//! use som_ifc::ModelBuilder;
//! use som_schema::{Schema, SchemaObject};
//! use som_validation::{IdentificationConfig, IssueKind, check_model};
//!
//! let schema = Schema::new("demo").with_objects(vec![SchemaObject::new("WAL", "Wall")]);
//!
//! let mut builder = ModelBuilder::new();
//! let wall = builder.element("2O2Fr$t4X7Zf8NOew3FLOH", "IFCWALL");
//! builder.property(wall, "Identity", "Identifier", "WAL");
//! let model = builder.build();
//!
//! let identification = IdentificationConfig::new("Identity", "Identifier").unwrap();
//! let report = check_model(&model, &schema, &identification);
//! assert_eq!(report.count(IssueKind::NoGroupMembership), 1);
//! assert_eq!(report.entities.len(), 1);
//! ```

pub mod element;
pub mod groups;
pub mod identifier;
pub mod issue;
pub mod rules;

pub use element::Checker;
pub use groups::{GroupForest, GroupNode, GroupTopologyBuilder, GroupTree, Revisit};
pub use identifier::{
    Identification, IdentificationConfig, identify, resolve_identifier, resolve_object,
};
pub use issue::{CheckReport, EntityRecord, EntityRole, Issue, IssueKind};
pub use rules::{RuleResult, validate, validate_enumeration, validate_format, validate_range};

use som_ifc::IfcModel;
use som_schema::{IdentifierIndex, Schema};
use thiserror::Error;

/// Errors that can occur before any check runs
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check every element and every group tree of a model.
///
/// Callers checking many models against one schema should build the
/// [`IdentifierIndex`] once and drive a [`Checker`] directly.
#[must_use]
pub fn check_model(
    model: &IfcModel,
    schema: &Schema,
    identification: &IdentificationConfig,
) -> CheckReport {
    let index = IdentifierIndex::build(schema);
    let checker = Checker::new(schema, &index, identification);
    let mut report = CheckReport::new();

    for element in model.elements() {
        checker.check_element(model, element, EntityRole::Element, &mut report);
    }

    let forest = GroupTopologyBuilder::new(model, identification).build_forest();
    for tree in &forest.trees {
        checker.check_group_tree(model, &forest, tree, &mut report);
    }
    checker.check_group_cycles(model, &forest, &mut report);

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use som_ifc::ModelBuilder;
    use som_schema::SchemaObject;

    #[test]
    fn test_check_model_covers_elements_and_groups() {
        let schema = Schema::new("S").with_objects(vec![SchemaObject::new("A", "A")]);
        let mut builder = ModelBuilder::new();
        let group = builder.group("G");
        let element = builder.element("E", "IFCWALL");
        builder
            .assign(group, &[element])
            .property(element, "Identity", "Identifier", "A")
            .property(group, "Identity", "Identifier", "A");
        let model = builder.build();
        let identification = IdentificationConfig::new("Identity", "Identifier").unwrap();

        let report = check_model(&model, &schema, &identification);
        assert!(report.is_clean(), "{:?}", report.issues);
        assert_eq!(report.entities.len(), 2);
    }
}
