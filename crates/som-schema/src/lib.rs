//! # som-schema
//!
//! Classification schema graph for the model checker.
//!
//! A schema is a catalog of objects, each identified by an identity value and
//! carrying property sets whose attributes declare value rules. Aggregation
//! nodes arrange the objects into the allowed nesting topology; an edge tagged
//! as pure inheritance does not count as a nesting step.

pub mod aggregation;
pub mod index;
pub mod loader;
pub mod model;

pub use index::IdentifierIndex;
pub use loader::SchemaLoader;
pub use model::{
    AggregationNode, ConnectionKind, FormatPattern, RangeBound, Schema, SchemaAttribute,
    SchemaObject, SchemaPropertySet, ValueRule,
};

use thiserror::Error;

/// Errors that can occur when loading or assembling a schema
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read schema '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Invalid pattern '{pattern}' for attribute '{attribute}': {source}")]
    InvalidPattern {
        attribute: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid range for attribute '{attribute}': {details}")]
    InvalidRange { attribute: String, details: String },

    #[error("Duplicate identity value: {0}")]
    DuplicateIdentifier(String),

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Circular dependency: {0}")]
    CircularDependency(String),
}

pub type Result<T> = std::result::Result<T, Error>;
