//! Extraction entry point
//!
//! Ties the listing reader, the detail parser and the assembler together for
//! one message request.

use edi_structure::attributes::listing_position;
use edi_structure::{MaxOccurs, MessageStructure, Requirement, Segment, StructureNode};
use tracing::{debug, info};

use crate::Result;
use crate::assembler::assemble;
use crate::detail::DetailConfig;
use crate::diagnostics::Skipped;
use crate::directory::{read_listing, segment_elements};
use crate::source::{MarkupSource, MessageRequest};

/// Documents that describe a single service segment instead of a message
const SERVICE_SEGMENTS: [&str; 4] = ["UNH", "UNT", "BGM", "DTM"];

/// Result of one extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub structure: MessageStructure,
    /// Lines and listing entries that were dropped
    pub skipped: Vec<Skipped>,
}

/// Builds message structures from a [`MarkupSource`]
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: DetailConfig,
}

impl Extractor {
    pub fn new(config: DetailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetailConfig {
        &self.config
    }

    /// Whether `document` names a single service segment
    pub fn is_service_segment(document: &str) -> bool {
        SERVICE_SEGMENTS
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(document))
    }

    /// Extract the structure of the requested message
    pub fn extract(&self, request: &MessageRequest, source: &dyn MarkupSource) -> Result<Extraction> {
        info!(
            "Extracting {} {} {}",
            request.standard, request.revision, request.document
        );
        let structure = MessageStructure::new(&request.standard, &request.revision, &request.document);

        if Self::is_service_segment(&request.document) {
            return Ok(self.extract_service_segment(request, source, structure));
        }

        let markup = source.message_listing(&request.revision, &request.document)?;
        let listing = read_listing(&markup)?;
        let resolved = listing.resolve(source, &request.revision, &self.config);

        for skipped in &resolved.skipped {
            debug!("Skipped {}", skipped);
        }

        let structure = assemble(structure, resolved.markers, &resolved.hierarchy)?;
        Ok(Extraction {
            structure,
            skipped: resolved.skipped,
        })
    }

    fn extract_service_segment(
        &self,
        request: &MessageRequest,
        source: &dyn MarkupSource,
        structure: MessageStructure,
    ) -> Extraction {
        let tag = request.document.to_uppercase();
        debug!("Document {} is a service segment", tag);

        let (elements, skipped) = segment_elements(source, &request.revision, &tag, &self.config);
        let segment = Segment::new(&tag, Requirement::Mandatory)
            .with_max(MaxOccurs::Bounded(1))
            .with_position(listing_position(0))
            .with_description(format!("Service segment {tag}"))
            .with_elements(elements);

        Extraction {
            structure: structure.with_segments(vec![StructureNode::Segment(segment)]),
            skipped,
        }
    }
}
