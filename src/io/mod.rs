//! Whole-file loading of host executables.
//!
//! The executable is read exactly once, in full, into an immutable
//! [`ExecutableImage`]. Every later stage addresses that buffer by offset;
//! nothing re-reads or maps the file incrementally. Module contents handed to
//! callers are reference-counted slices of the same allocation.

pub mod error;

use crate::io::error::{IoError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Defines the resource limits for loading an executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be loaded.
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// The full, immutable byte content of a host executable.
#[derive(Debug, Clone)]
pub struct ExecutableImage {
    path: Option<PathBuf>,
    data: Bytes,
}

impl ExecutableImage {
    /// Reads the whole file at `path` into memory.
    ///
    /// Fails with `IoError::FileTooLarge` when the file exceeds
    /// `limits.max_file_size`, checked both against metadata and against the
    /// bytes actually read.
    pub fn read<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Loading executable image"
        );

        if file_size > limits.max_file_size {
            warn!(
                path = %path.display(),
                size = file_size,
                limit = limits.max_file_size,
                "File is too large"
            );
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: file_size,
            });
        }

        // The file may change size between stat and read; never read past the limit.
        let mut buf = Vec::with_capacity(file_size as usize);
        file.take(limits.max_file_size.saturating_add(1))
            .read_to_end(&mut buf)?;
        let actual = buf.len() as u64;
        if actual > limits.max_file_size {
            return Err(IoError::FileTooLarge {
                limit: limits.max_file_size,
                found: actual,
            });
        }
        if actual < file_size {
            return Err(IoError::ShortRead {
                expected: file_size,
                actual,
            });
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Bytes::from(buf),
        })
    }

    /// Wraps bytes already in memory.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self {
            path: None,
            data: data.into(),
        }
    }

    /// Path the image was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Zero-copy slice of the image. Callers bounds-check first; out-of-range
    /// requests yield `None` rather than panicking.
    pub fn slice(&self, range: Range<u64>) -> Option<Bytes> {
        if range.start > range.end || range.end > self.len() {
            return None;
        }
        Some(self.data.slice(range.start as usize..range.end as usize))
    }
}
