//! Markup sources
//!
//! Extraction never fetches anything itself. A [`MarkupSource`] supplies the
//! directory page of a message and the detail page of each segment; how they
//! are obtained (network, disk, fixtures) is the caller's concern.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Which message of which directory revision to extract
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Standard name, for example `EDIFACT`
    pub standard: String,
    /// Directory revision, for example `D97A`
    pub revision: String,
    /// Message type, for example `ORDERS`
    pub document: String,
}

impl MessageRequest {
    pub fn new(
        standard: impl Into<String>,
        revision: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            standard: standard.into(),
            revision: revision.into(),
            document: document.into(),
        }
    }
}

/// Supplier of directory and detail markup
pub trait MarkupSource: Send + Sync {
    /// Directory page listing the segments and groups of `document`
    fn message_listing(&self, revision: &str, document: &str) -> Result<String>;

    /// Detail page (or bare detail text) of segment `tag`
    fn segment_detail(&self, revision: &str, tag: &str) -> Result<String>;
}

/// In-memory source, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySource {
    listings: HashMap<(String, String), String>,
    details: HashMap<(String, String), String>,
    detail_requests: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(
        mut self,
        revision: impl Into<String>,
        document: impl Into<String>,
        markup: impl Into<String>,
    ) -> Self {
        self.listings
            .insert((revision.into(), document.into()), markup.into());
        self
    }

    pub fn with_segment(
        mut self,
        revision: impl Into<String>,
        tag: impl Into<String>,
        markup: impl Into<String>,
    ) -> Self {
        self.details.insert((revision.into(), tag.into()), markup.into());
        self
    }

    /// Number of `segment_detail` calls served so far, found or not
    pub fn detail_requests(&self) -> usize {
        self.detail_requests.load(Ordering::Relaxed)
    }
}

impl MarkupSource for MemorySource {
    fn message_listing(&self, revision: &str, document: &str) -> Result<String> {
        self.listings
            .get(&(revision.to_string(), document.to_string()))
            .cloned()
            .ok_or_else(|| Error::unavailable(format!("{revision}/{document}"), "no listing"))
    }

    fn segment_detail(&self, revision: &str, tag: &str) -> Result<String> {
        self.detail_requests.fetch_add(1, Ordering::Relaxed);
        self.details
            .get(&(revision.to_string(), tag.to_string()))
            .cloned()
            .ok_or_else(|| Error::unavailable(format!("{revision}/{tag}"), "no segment detail"))
    }
}

/// Saved directory pages laid out per revision
///
/// ```text
/// <root>/<revision>/message/<DOCUMENT>.html
/// <root>/<revision>/segment/<TAG>.html
/// ```
///
/// A `.txt` file is accepted in place of `.html`.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, revision: &str, kind: &str, name: &str) -> Result<String> {
        let dir = self.root.join(revision).join(kind);
        for extension in ["html", "txt"] {
            let path = dir.join(format!("{name}.{extension}"));
            if path.is_file() {
                debug!("Reading {}", path.display());
                return fs::read_to_string(&path)
                    .map_err(|e| Error::unavailable(path.display().to_string(), e.to_string()));
            }
        }
        Err(Error::unavailable(
            dir.join(format!("{name}.html")).display().to_string(),
            "file not found",
        ))
    }
}

impl MarkupSource for FolderSource {
    fn message_listing(&self, revision: &str, document: &str) -> Result<String> {
        self.read(revision, "message", &document.to_uppercase())
    }

    fn segment_detail(&self, revision: &str, tag: &str) -> Result<String> {
        self.read(revision, "segment", &tag.to_uppercase())
    }
}
