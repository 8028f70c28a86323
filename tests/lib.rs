//! Integration tests for bunfs-extract.
//!
//! Containers are wrapped in synthetic host executables and run through the
//! public pipeline, from file on disk to written output.

mod common;
mod extraction;
