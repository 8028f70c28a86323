//! Configuration for an extraction run.
//!
//! The parsing core consumes only what is listed here. Output directory,
//! reformatting and similar writer concerns live with the caller.

use crate::graph::types::DescriptorLayout;
use crate::io::IOLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Master configuration for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Executable to read.
    pub source_path: PathBuf,
    /// Drop binary modules (native add-ons, wasm) from the result.
    pub skip_binary_modules: bool,
    /// Limits applied when loading the executable.
    pub io: IOLimits,
    /// Container decoding knobs.
    pub graph: GraphConfig,
}

impl ExtractConfig {
    pub fn new<P: AsRef<Path>>(source_path: P) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_skip_binary_modules(mut self, skip: bool) -> Self {
        self.skip_binary_modules = skip;
        self
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Container decoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Force a descriptor layout instead of inferring it from the metadata
    /// length (default: infer).
    pub layout: Option<DescriptorLayout>,
    /// Module count at which extraction fans out across threads; 0 disables
    /// fan-out (default: 64).
    pub parallel_threshold: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            layout: None,
            parallel_threshold: 64,
        }
    }
}
