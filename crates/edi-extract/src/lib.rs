#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edi-extract
//!
//! Extraction of EDI message structures from directory markup.
//!
//! The directory page of a message lists its segments and segment groups in
//! document order, with group nesting only visible through the page layout.
//! Each segment has a detail page whose preformatted block lists composites
//! and elements, nesting again encoded as indentation. This crate turns both
//! into a [`MessageStructure`](edi_structure::MessageStructure):
//!
//! ```text
//! detail text ──► detail::parse_segment_detail ─┐
//! listing markup ──► directory::read_listing ───┴─► assembler::assemble
//! ```

pub mod assembler;
pub mod detail;
pub mod diagnostics;
pub mod directory;
pub mod extractor;
mod markup;
pub mod source;

pub use assembler::assemble;
pub use detail::{DetailConfig, SegmentDetail, classify_line, parse_segment_detail};
pub use diagnostics::{SkipReason, Skipped};
pub use directory::{
    DirectoryListing, GroupHierarchy, GroupMarker, Marker, ResolvedListing, ResolvedMarker, SegmentMarker, read_listing,
};
pub use extractor::{Extraction, Extractor};
pub use markup::detail_text;
pub use source::{FolderSource, MarkupSource, MemorySource, MessageRequest};

use thiserror::Error;

/// Errors that can occur while extracting a message structure
#[derive(Error, Debug)]
pub enum Error {
    #[error("Markup error: {0}")]
    Markup(String),

    #[error("Source error for {resource}: {message}")]
    Source { resource: String, message: String },

    #[error("Assembly invariant violated for group {group}: {reason}")]
    AssemblyInvariantViolation { group: String, reason: String },
}

impl Error {
    /// Build a source error for the resource that could not be supplied.
    pub fn unavailable(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Build an assembly invariant violation for a group.
    pub fn invariant(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssemblyInvariantViolation {
            group: group.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
