#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # som-ifc
//!
//! IFC (ISO-10303-21) reader for the model checker.
//!
//! This crate parses the DATA section of an IFC file and exposes the view the
//! checker needs: elements and groups with their global ids, their property
//! sets (occurrence and type level), and the group assignment relationships
//! in both directions.
//!
//! ## Example Usage
//!
//! ```rust
//! use som_ifc::{ModelBuilder, Value};
//!
//! let mut builder = ModelBuilder::new();
//! let wall = builder.element("2O2Fr$t4X7Zf8NOew3FLOH", "IFCWALL");
//! builder.property(wall, "Pset_Identity", "Code", "W-100");
//! let model = builder.build();
//!
//! let pset = model.property_set(wall, "Pset_Identity").unwrap();
//! assert_eq!(pset.get("Code"), Some(&Value::from("W-100")));
//! ```

/// Resolution of raw entities into the checker's model view.
mod decoder;
/// Model view over elements, groups, property sets and assignments.
pub mod model;
/// DATA section scanning and STEP string decoding.
pub mod scanner;
/// nom-based STEP attribute tokenizer.
pub mod tokenizer;
/// Classification of IFC entity type names.
pub mod types;
/// Property values shared with the schema and the validator.
pub mod value;

pub use model::{EntityId, IfcModel, ModelBuilder, ModelObject, PropertySet, PropertySets};
pub use types::ObjectClass;
pub use value::Value;

use thiserror::Error;

/// Errors that can occur while reading an IFC model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not an IFC file: {0}")]
    InvalidFormat(String),

    #[error("Failed to parse entity #{id}: {message}")]
    EntityParse { id: u32, message: String },

    #[error("Malformed statement near byte {offset}: {message}")]
    Statement { offset: usize, message: String },
}

impl Error {
    /// Build an entity parse error with the entity id as context.
    pub fn entity_parse(id: u32, message: impl Into<String>) -> Self {
        Self::EntityParse {
            id,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
