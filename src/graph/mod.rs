//! Bun standalone module graph decoding.
//!
//! A single linear pass: footer → index → extract (→ classify, per module).
//! Each stage is a pure function of the image and the ranges derived by the
//! stage before it; any failure aborts the whole decode.

pub mod builder;
pub mod classify;
pub mod extract;
pub mod footer;
pub mod index;
pub mod types;
pub mod utils;

use crate::config::GraphConfig;
use crate::error::Result;
use crate::io::ExecutableImage;
use crate::locate::{HostFormat, SectionSpan};
use crate::span_trace;
use tracing::info;

pub use classify::classify;
pub use extract::{extract, strip_bytecode_prefix, ExtractedModule};
pub use footer::{parse_footer, parse_footer_with, FooterRecord};
pub use index::{decode_index, ModuleDescriptor};
pub use types::*;

/// A fully decoded container.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub span: SectionSpan,
    pub footer: FooterRecord,
    /// Modules in index order.
    pub modules: Vec<ExtractedModule>,
    /// Compile-time `execArgv`, when one was embedded.
    pub exec_argv: Option<String>,
}

impl ModuleGraph {
    /// Decode the container at `span` inside `image`.
    pub fn decode(image: &ExecutableImage, span: SectionSpan, config: &GraphConfig) -> Result<Self> {
        let span_guard = span_trace!("decode_graph", offset = span.offset, size = span.size);
        let _enter = span_guard.enter();

        let footer = footer::parse_footer_with(image, &span, config.layout)?;
        let descriptors = index::decode_index(image, &span, &footer)?;
        let modules = extract::extract(image, &span, &footer, &descriptors, config)?;
        let exec_argv = footer::exec_argv(image, &span, &footer)?;

        info!(
            modules = modules.len(),
            layout = ?footer.layout,
            entry_point = footer.entry_point_id,
            "Decoded module graph"
        );
        Ok(Self {
            span,
            footer,
            modules,
            exec_argv,
        })
    }

    /// Decode a bare container section with no host executable around it.
    pub fn from_section(section: impl Into<bytes::Bytes>, config: &GraphConfig) -> Result<Self> {
        let image = ExecutableImage::from_bytes(section);
        let span = SectionSpan {
            offset: 0,
            size: image.len(),
            format: HostFormat::Elf,
        };
        Self::decode(&image, span, config)
    }

    /// The module the executable starts from.
    pub fn entry_point(&self) -> Option<&ExtractedModule> {
        self.modules.get(self.footer.entry_point_id as usize)
    }

    pub fn flags(&self) -> GraphFlags {
        self.footer.flags
    }

    pub fn text_modules(&self) -> impl Iterator<Item = &ExtractedModule> {
        self.modules.iter().filter(|m| m.is_text())
    }

    /// Drop binary modules, keeping index order.
    pub fn retain_text(&mut self) {
        self.modules.retain(|m| m.is_text());
    }
}
