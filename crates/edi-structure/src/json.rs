//! JSON projection of a message structure
//!
//! The persisted file is pretty-printed with two-space indentation and a fixed
//! field order, so identical structures always serialize to identical bytes.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::model::MessageStructure;
use crate::{Error, Result};

/// Parse a structure from JSON text
pub fn from_json(json: &str) -> Result<MessageStructure> {
    serde_json::from_str(json).map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))
}

/// Serialize a structure to pretty JSON
pub fn to_json(structure: &MessageStructure) -> Result<String> {
    serde_json::to_string_pretty(structure).map_err(|e| Error::Serialize(e.to_string()))
}

/// Load a structure from a JSON file
pub fn load_from_file(path: &Path) -> Result<MessageStructure> {
    trace!("Loading message structure from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    from_json(&content)
}

/// Conventional location of an extracted structure: `<dir>/<revision>/<document>.json`
pub fn structure_path(output_dir: &Path, structure: &MessageStructure) -> PathBuf {
    output_dir
        .join(&structure.revision)
        .join(format!("{}.json", structure.document))
}

/// Save a structure under `output_dir`, creating the revision directory
pub fn save_to_dir(output_dir: &Path, structure: &MessageStructure) -> Result<PathBuf> {
    let path = structure_path(output_dir, structure);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, to_json(structure)?)?;
    debug!("Saved message structure to {:?}", path);
    Ok(path)
}
