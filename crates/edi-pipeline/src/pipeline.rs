//! Pipeline orchestration
//!
//! One run takes a message request through extraction and descriptor
//! generation. Each run owns its structure; nothing is shared between runs.

use std::time::{Duration, Instant};

use edi_extract::{Extraction, Extractor, MarkupSource, MessageRequest};
use edi_format::{Dialect, EmitOptions, FormatDescriptor};
use edi_structure::MessageStructure;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::Result;

/// Extraction followed by generation
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    extractor: Extractor,
    options: EmitOptions,
}

/// Result of one complete run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub structure: MessageStructure,
    pub descriptor: FormatDescriptor,
    /// Lines and listing entries dropped during extraction
    pub skipped: usize,
    pub duration: Duration,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            extractor: Extractor::new(config.detail_config()),
            options: config.emit_options(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract the structure of `request`
    pub fn extract(&self, request: &MessageRequest, source: &dyn MarkupSource) -> Result<Extraction> {
        let extraction = self.extractor.extract(request, source)?;
        if !extraction.skipped.is_empty() {
            warn!(
                "{} {}: {} lines or entries skipped during extraction",
                request.revision,
                request.document,
                extraction.skipped.len()
            );
        }
        Ok(extraction)
    }

    /// Generate the descriptor of `structure` for `dialect`
    pub fn generate(&self, structure: &MessageStructure, dialect: Dialect) -> Result<FormatDescriptor> {
        Ok(edi_format::emit(structure, dialect, &self.options)?)
    }

    /// Extract `request` and generate its descriptor
    ///
    /// The dialect is the request's standard.
    pub fn run(&self, request: &MessageRequest, source: &dyn MarkupSource) -> Result<RunResult> {
        let started = Instant::now();
        let dialect: Dialect = request.standard.parse()?;

        let extraction = self.extract(request, source)?;
        let descriptor = self.generate(&extraction.structure, dialect)?;

        let duration = started.elapsed();
        info!(
            "Completed {} {} {} in {:?} ({} nodes)",
            request.standard,
            request.revision,
            request.document,
            duration,
            extraction.structure.segment_count()
        );

        Ok(RunResult {
            structure: extraction.structure,
            descriptor,
            skipped: extraction.skipped.len(),
            duration,
        })
    }
}
