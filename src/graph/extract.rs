//! Module extractor.
//!
//! Turns validated descriptors into [`ExtractedModule`]s. Content is handed
//! out as zero-copy [`Bytes`] slices of the image. Text modules may carry a
//! bytecode pragma or CommonJS wrapper in front of their source; it is removed
//! only on an exact prefix match and never from binary modules.

use crate::config::GraphConfig;
use crate::error::{ExtractError, Result};
use crate::graph::classify::classify;
use crate::graph::footer::FooterRecord;
use crate::graph::index::ModuleDescriptor;
use crate::graph::types::{
    Encoding, Loader, ModuleClass, ModuleFormat, Side, StringPointer, BUNFS_ROOTS,
};
use crate::io::ExecutableImage;
use crate::locate::SectionSpan;
use bytes::Bytes;
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::{debug, trace};

/// CommonJS wrapper Bun emits ahead of bytecode-cached module source.
pub const BYTECODE_CJS_PREFIX: &[u8] =
    b"// @bun @bytecode @bun-cjs\n(function(exports, require, module, __filename, __dirname) {";

/// CommonJS wrapper Bun emits ahead of module source compiled without
/// `--bytecode`.
pub const CJS_WRAPPER_PREFIX: &[u8] =
    b"// @bun @bun-cjs\n(function(exports, require, module, __filename, __dirname) {";

/// Pragma Bun emits ahead of bytecode-cached ESM source.
pub const BYTECODE_ESM_PREFIX: &[u8] = b"// @bun @bytecode\n";

/// Recognised prefixes, longest first so a wrapper wins over a bare pragma.
const BYTECODE_PREFIXES: &[&[u8]] = &[
    BYTECODE_CJS_PREFIX,
    CJS_WRAPPER_PREFIX,
    BYTECODE_ESM_PREFIX,
];

/// A recovered module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedModule {
    /// Position in the module index; 0 is the entry module.
    pub index: usize,
    /// Path exactly as stored in the container.
    pub path: String,
    /// Module bytes, with any bytecode prefix removed from text modules.
    pub content: Bytes,
    pub kind: ModuleClass,
    pub loader: Loader,
    pub encoding: Encoding,
    pub module_format: ModuleFormat,
    pub side: Side,
    /// Embedded source map, empty when none was stored.
    pub sourcemap: Bytes,
    /// Size of the cached bytecode blob, 0 when none was stored.
    pub bytecode_len: u32,
    pub stripped_prefix: bool,
}

impl ExtractedModule {
    pub fn is_text(&self) -> bool {
        self.kind.is_text()
    }

    /// Path with the virtual filesystem root removed, suitable for joining
    /// onto an output directory. Never empty.
    pub fn relative_path(&self) -> String {
        let mut path = Cow::Borrowed(self.path.as_str());
        for root in BUNFS_ROOTS {
            if let Some(rest) = self.path.strip_prefix(root) {
                path = if root.contains('\\') {
                    Cow::Owned(rest.replace('\\', "/"))
                } else {
                    Cow::Borrowed(rest)
                };
                break;
            }
        }
        let trimmed = path.trim_matches(|c: char| matches!(c, '/' | '\0' | '\n' | '\t'));
        if trimmed.is_empty() {
            format!("module_{}", self.index)
        } else {
            trimmed.to_string()
        }
    }

    /// Content decoded as text; `None` for binary modules.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match (self.kind, self.encoding) {
            (ModuleClass::Binary, _) => None,
            (ModuleClass::Text, Encoding::Latin1) => {
                Some(encoding_rs::mem::decode_latin1(&self.content))
            }
            (ModuleClass::Text, _) => {
                Some(encoding_rs::UTF_8.decode_without_bom_handling(&self.content).0)
            }
        }
    }
}

/// Remove a recognised bytecode prefix. Only the leading bytes are compared.
pub fn strip_bytecode_prefix(content: &Bytes) -> (Bytes, bool) {
    for prefix in BYTECODE_PREFIXES {
        if content.starts_with(prefix) {
            return (content.slice(prefix.len()..), true);
        }
    }
    (content.clone(), false)
}

/// Extract every descriptor, preserving index order.
///
/// When the module count reaches `config.parallel_threshold` the work fans out
/// over rayon; each unit reads a disjoint range of the shared image and the
/// indexed collect keeps index order.
pub fn extract(
    image: &ExecutableImage,
    span: &SectionSpan,
    footer: &FooterRecord,
    descriptors: &[ModuleDescriptor],
    config: &GraphConfig,
) -> Result<Vec<ExtractedModule>> {
    let data_offset = span.offset + footer.data_region.offset;
    let parallel = config.parallel_threshold > 0 && descriptors.len() >= config.parallel_threshold;
    debug!(count = descriptors.len(), parallel, "Extracting modules");

    let modules: Vec<ExtractedModule> = if parallel {
        descriptors
            .par_iter()
            .map(|d| extract_module(image, data_offset, d))
            .collect::<Result<_>>()?
    } else {
        descriptors
            .iter()
            .map(|d| extract_module(image, data_offset, d))
            .collect::<Result<_>>()?
    };
    Ok(modules)
}

fn extract_module(
    image: &ExecutableImage,
    data_offset: u64,
    descriptor: &ModuleDescriptor,
) -> Result<ExtractedModule> {
    let index = descriptor.index;
    let slice = |ptr: StringPointer, field: &str| -> Result<Bytes> {
        let start = data_offset + ptr.offset as u64;
        image
            .slice(start..data_offset + ptr.end())
            .ok_or_else(|| ExtractError::descriptor(index, format!("{field} lies outside the image")))
    };

    let path_bytes = slice(descriptor.path, "path")?;
    let path = std::str::from_utf8(&path_bytes)
        .map_err(|source| ExtractError::InvalidPathEncoding { index, source })?
        .to_string();

    let raw = slice(descriptor.contents, "contents")?;
    let kind = classify(descriptor.loader, &path);
    let (content, stripped_prefix) = if kind.is_text() {
        strip_bytecode_prefix(&raw)
    } else {
        (raw, false)
    };
    let sourcemap = slice(descriptor.sourcemap, "sourcemap")?;

    trace!(
        index,
        path = %path,
        %kind,
        size = content.len(),
        stripped_prefix,
        "Extracted module"
    );

    Ok(ExtractedModule {
        index,
        path,
        content,
        kind,
        loader: descriptor.loader,
        encoding: descriptor.encoding,
        module_format: descriptor.module_format,
        side: descriptor.side,
        sourcemap,
        bytecode_len: descriptor.bytecode.length,
        stripped_prefix,
    })
}
