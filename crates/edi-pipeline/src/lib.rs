#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # edi-pipeline
//!
//! Orchestration of extraction and descriptor generation.
//!
//! This crate ties the extractor and the emitter together behind a YAML
//! configuration, runs batches of message requests concurrently and lays
//! the resulting artifacts out in an ixpath working folder.

pub mod batch;
pub mod config;
pub mod ixpath;
pub mod pipeline;

pub use batch::{BatchOutcome, BatchRunner, BatchSummary};
pub use config::PipelineConfig;
pub use ixpath::{ArtifactWriter, WrittenArtifacts, save_structure};
pub use pipeline::{Pipeline, RunResult};

use thiserror::Error;

/// Errors that can occur in the pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Extract(#[from] edi_extract::Error),

    #[error(transparent)]
    Format(#[from] edi_format::Error),

    #[error(transparent)]
    Structure(#[from] edi_structure::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch error: {0}")]
    Batch(String),

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },
}

impl Error {
    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("io", "<unknown>", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
