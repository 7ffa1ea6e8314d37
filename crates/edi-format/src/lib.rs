#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edi-format
//!
//! ixDOC format descriptor emission.
//!
//! [`emit`] compiles a [`MessageStructure`] into the descriptor of one target
//! dialect. EDIFACT and X12 produce an interchange wrapper plus a `MESSAGE`
//! body fragment it includes by entity; IDOC produces a single flat document.
//! Emission is a pure function of its inputs: the same structure, dialect and
//! options always give byte-identical output.

pub mod dialect;
mod delimited;
mod envelope;
pub mod idoc;
pub mod naming;
mod writer;

pub use dialect::{Dialect, DialectSpec, Separators};
pub use idoc::{IdocRecord, linearize, records_from_json};

use edi_structure::MessageStructure;
use thiserror::Error;
use tracing::info;

/// Default fragment root referenced by interchange wrappers
pub const DEFAULT_FRAGMENT_ROOT: &str = "./../../SFEDI/format";

/// Group `max` used when a structure gives none
pub const DEFAULT_GROUP_MAX: &str = "10";

/// Errors that can occur when emitting a descriptor
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or malformed structure (an empty root is the "missing model" case)
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("XML write error: {0}")]
    Xml(String),

    #[error("Invalid IDOC records: {0}")]
    Records(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Emission settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// `max` of groups whose structure gives no bound
    pub default_group_max: String,
    /// Root of the fragment tree as seen from the wrapper
    pub fragment_root: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            default_group_max: DEFAULT_GROUP_MAX.to_string(),
            fragment_root: DEFAULT_FRAGMENT_ROOT.to_string(),
        }
    }
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_group_max(mut self, max: impl Into<String>) -> Self {
        self.default_group_max = max.into();
        self
    }

    pub fn fragment_root(mut self, root: impl Into<String>) -> Self {
        self.fragment_root = root.into();
        self
    }
}

/// A fragment referenced by the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFragment {
    /// Path below the fragment root (`edifact/D97A/ORDERS.xml`)
    pub path: String,
    pub content: String,
}

/// Emitted descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub dialect: Dialect,
    /// Descriptor document
    pub content: String,
    /// Derived file name of `content`
    pub file_name: String,
    /// Entity name of the message body, or the IDOC reference name
    pub reference: String,
    /// Message body fragment; `None` when the body is inline
    pub body: Option<MessageFragment>,
}

/// Compile `structure` into a descriptor for `dialect`
pub fn emit(structure: &MessageStructure, dialect: Dialect, options: &EmitOptions) -> Result<FormatDescriptor> {
    if structure.is_empty() {
        return Err(Error::InvalidModel(format!(
            "{} {} {} has no segments",
            structure.standard, structure.revision, structure.document
        )));
    }

    let spec = dialect.spec();
    let descriptor = match (spec.separators.as_ref(), spec.envelope.as_ref()) {
        (Some(separators), Some(envelope)) => {
            let body = delimited::emit_body(structure, separators, options)?;
            let content = envelope::interchange_document(
                dialect,
                separators,
                envelope,
                &structure.revision,
                &structure.document,
                &options.fragment_root,
            );
            FormatDescriptor {
                dialect,
                content,
                file_name: naming::descriptor_file_name(
                    dialect,
                    &structure.standard,
                    &structure.revision,
                    &structure.document,
                ),
                reference: naming::body_entity(dialect, &structure.document),
                body: Some(MessageFragment {
                    path: naming::fragment_path(dialect, &structure.revision, &structure.document),
                    content: body,
                }),
            }
        }
        _ => return emit_idoc(&linearize(structure), &structure.document),
    };

    info!("Generated {} descriptor {}", dialect, descriptor.file_name);
    Ok(descriptor)
}

/// Compile an IDOC record list into a descriptor for message `document`
pub fn emit_idoc(records: &[IdocRecord], document: &str) -> Result<FormatDescriptor> {
    if records.is_empty() {
        return Err(Error::InvalidModel(format!("{document} has no IDOC records")));
    }

    let dialect = Dialect::Idoc;
    let reference = naming::reference_name(document);
    let content = idoc::emit_records(records, &reference, dialect.spec().root_wrapper)?;
    let file_name = naming::descriptor_file_name(dialect, dialect.name(), "", document);

    info!("Generated {} descriptor {}", dialect, file_name);
    Ok(FormatDescriptor {
        dialect,
        content,
        file_name,
        reference,
        body: None,
    })
}
