//! Artifact layout on disk
//!
//! Descriptors are written into an ixpath working folder:
//!
//! ```text
//! <folder>/SFEDI/format/edifact/D97A/ORDERS.xml                 message body
//! <folder>/SFEDI/format/edifact/D97A/DN__EDIFACT-D97A-ORDERS.xml
//! <folder>/SFEDI/format/idoc/DN__IDoc-Fixed-ORDERS05-ORDERS0.xml
//! ```
//!
//! Extracted structures go to `<output_dir>/<revision>/<document>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use edi_format::FormatDescriptor;
use edi_structure::MessageStructure;
use tracing::info;

use crate::{Error, Result};

const FORMAT_ROOT: [&str; 2] = ["SFEDI", "format"];

/// Files written for one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub descriptor: PathBuf,
    pub body: Option<PathBuf>,
}

/// Writes descriptors below an ixpath working folder
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    folder: PathBuf,
}

impl ArtifactWriter {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self { folder: folder.into() }
    }

    /// `<folder>/SFEDI/format`
    pub fn format_root(&self) -> PathBuf {
        FORMAT_ROOT
            .iter()
            .fold(self.folder.clone(), |path, part| path.join(part))
    }

    /// Write the descriptor and its body fragment
    pub fn write(&self, descriptor: &FormatDescriptor) -> Result<WrittenArtifacts> {
        let root = self.format_root();

        let (descriptor_dir, body) = match &descriptor.body {
            Some(fragment) => {
                let path = root.join(&fragment.path);
                write_file(&path, &fragment.content)?;
                let dir = path.parent().map_or_else(|| root.clone(), Path::to_path_buf);
                (dir, Some(path))
            }
            None => (root.join(descriptor.dialect.spec().fragment_dir), None),
        };

        let descriptor_path = descriptor_dir.join(&descriptor.file_name);
        write_file(&descriptor_path, &descriptor.content)?;
        info!("Wrote {} descriptor to {}", descriptor.dialect, descriptor_path.display());

        Ok(WrittenArtifacts {
            descriptor: descriptor_path,
            body,
        })
    }
}

/// Save an extracted structure as `<output_dir>/<revision>/<document>.json`
pub fn save_structure(output_dir: &Path, structure: &MessageStructure) -> Result<PathBuf> {
    let path = edi_structure::json::save_to_dir(output_dir, structure)?;
    info!("Saved structure to {}", path.display());
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::io("create directory", parent.display().to_string(), e.to_string()))?;
    }
    fs::write(path, content).map_err(|e| Error::io("write", path.display().to_string(), e.to_string()))
}
