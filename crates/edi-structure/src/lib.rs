#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edi-structure
//!
//! Message structure model for EDI directory definitions.
//!
//! A [`MessageStructure`] is the normalized tree compiled from a directory
//! listing: groups (`SG<n>`) containing segments and nested groups, segments
//! containing simple elements and composites. The JSON projection of this tree
//! is the interchange file shared between extraction and descriptor generation.

/// Requirement, occurrence, data type and position attributes.
pub mod attributes;
/// JSON projection: load and save message structures.
pub mod json;
/// Tree node types.
pub mod model;

pub use attributes::{DataType, MaxOccurs, Requirement};
pub use model::{Composite, Element, ElementNode, Group, MessageStructure, Segment, StructureNode};

use thiserror::Error;

/// Errors that can occur when working with message structures
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid structure format: {0}")]
    InvalidFormat(String),

    #[error("Invalid attribute '{attribute}': {value}")]
    InvalidAttribute { attribute: String, value: String },

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an invalid-attribute error with the offending raw value.
    pub fn invalid_attribute(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Crate-local result type for structure operations.
pub type Result<T> = std::result::Result<T, Error>;
