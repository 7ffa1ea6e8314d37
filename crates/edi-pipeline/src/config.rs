//! Pipeline configuration
//!
//! Every field has a default, so a YAML file only needs to name what it
//! changes:
//!
//! ```yaml
//! tab_width: 4
//! default_group_max: "99"
//! output_dir: build/structures
//! ```

use std::path::{Path, PathBuf};

use edi_extract::DetailConfig;
use edi_extract::detail::DEFAULT_TAB_WIDTH;
use edi_format::{DEFAULT_FRAGMENT_ROOT, DEFAULT_GROUP_MAX, EmitOptions};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Configuration for the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Spaces per indentation level in segment detail blocks
    pub tab_width: usize,
    /// Group `max` for structures that give none
    pub default_group_max: String,
    /// Fragment root referenced by interchange wrappers
    pub fragment_root: String,
    /// Where extracted structures are saved
    pub output_dir: PathBuf,
    /// Requests processed at the same time in batch runs
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            default_group_max: DEFAULT_GROUP_MAX.to_string(),
            fragment_root: DEFAULT_FRAGMENT_ROOT.to_string(),
            output_dir: PathBuf::from("output"),
            max_concurrency: 4,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        debug!("Loading pipeline configuration from {:?}", path);
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::io("read config", path.display().to_string(), e.to_string()))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.tab_width == 0 {
            return Err(Error::Config("tab_width must be at least 1".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.default_group_max.trim().is_empty() {
            return Err(Error::Config("default_group_max must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    pub fn default_group_max(mut self, max: impl Into<String>) -> Self {
        self.default_group_max = max.into();
        self
    }

    pub fn fragment_root(mut self, root: impl Into<String>) -> Self {
        self.fragment_root = root.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Settings for the segment detail parser
    pub fn detail_config(&self) -> DetailConfig {
        DetailConfig::new().tab_width(self.tab_width)
    }

    /// Settings for descriptor emission
    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions::new()
            .default_group_max(self.default_group_max.clone())
            .fragment_root(self.fragment_root.clone())
    }
}
