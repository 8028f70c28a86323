//! Error types for module graph extraction.
//!
//! Every pipeline stage reports through [`ExtractError`]. Errors are never
//! recovered from inside the pipeline; the caller decides how to report them,
//! with [`ExtractError::is_container_missing`] singling out the one expected
//! condition (a host build without an embedded graph).

use std::fmt;
use thiserror::Error;

use crate::io::error::IoError;
use crate::locate::HostFormat;

/// Main error type for extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The host executable's own headers could not be parsed
    #[error("Malformed executable: {0}")]
    MalformedExecutable(String),

    /// The executable parsed but carries no module graph section
    #[error("Container not found: no {section} section in {format} image")]
    ContainerNotFound {
        format: HostFormat,
        section: &'static str,
    },

    /// Section too short to hold the trailer and footer
    #[error("Truncated footer: section is {size} bytes, need at least {needed}")]
    TruncatedFooter { size: u64, needed: u64 },

    /// Trailer bytes do not match the container magic
    #[error("Trailer magic mismatch at offset {offset:#x}: found {found:?}")]
    BadTrailer { offset: u64, found: String },

    /// Footer decoded but its regions are inconsistent
    #[error("Corrupt footer: {0}")]
    CorruptFooter(String),

    /// A single descriptor record is invalid
    #[error("Corrupt descriptor #{index}: {reason}")]
    CorruptDescriptor { index: usize, reason: String },

    /// A module path is not valid UTF-8
    #[error("Invalid path encoding in module #{index}: {source}")]
    InvalidPathEncoding {
        index: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Reading the executable failed
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Locate,
    Footer,
    Index,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Read => "read",
            Stage::Locate => "locate",
            Stage::Footer => "footer",
            Stage::Index => "index",
            Stage::Extract => "extract",
        };
        f.write_str(s)
    }
}

impl ExtractError {
    /// The stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            ExtractError::Io(_) => Stage::Read,
            ExtractError::MalformedExecutable(_) | ExtractError::ContainerNotFound { .. } => {
                Stage::Locate
            }
            ExtractError::TruncatedFooter { .. }
            | ExtractError::BadTrailer { .. }
            | ExtractError::CorruptFooter(_) => Stage::Footer,
            ExtractError::CorruptDescriptor { .. } => Stage::Index,
            ExtractError::InvalidPathEncoding { .. } => Stage::Extract,
        }
    }

    /// True when the executable simply has no embedded graph.
    pub fn is_container_missing(&self) -> bool {
        matches!(self, ExtractError::ContainerNotFound { .. })
    }

    pub(crate) fn descriptor(index: usize, reason: impl Into<String>) -> Self {
        ExtractError::CorruptDescriptor {
            index,
            reason: reason.into(),
        }
    }
}
