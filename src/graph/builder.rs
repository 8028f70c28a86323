//! Container writer.
//!
//! Serialises a module set into the same byte layout the parser reads:
//!
//! ```text
//! [leading bytes][strings ... execArgv ... descriptor array][footer][trailer]
//!                 \______________ data region _____________/
//! ```
//!
//! Strings are NUL-terminated on disk; pointers exclude the terminator. Used
//! for test fixtures, benchmarks and fuzz corpora.

use crate::graph::types::{
    DescriptorLayout, Encoding, GraphFlags, Loader, ModuleClass, ModuleFormat, Side,
    StringPointer, TRAILER,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("container data of {size} bytes exceeds the 32-bit pointer range")]
    TooLarge { size: usize },
}

/// One module to be written.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    path: Vec<u8>,
    contents: Vec<u8>,
    sourcemap: Vec<u8>,
    bytecode: Vec<u8>,
    module_info: Vec<u8>,
    bytecode_origin_path: Vec<u8>,
    encoding: Encoding,
    loader_tag: u8,
    module_format: ModuleFormat,
    side: Side,
}

impl ModuleEntry {
    /// Encoding defaults to UTF-8 for text loaders and binary otherwise.
    pub fn new(path: impl Into<String>, contents: Vec<u8>, loader: Loader) -> Self {
        Self::new_raw_path(path.into().into_bytes(), contents, loader)
    }

    /// Like [`ModuleEntry::new`] but with arbitrary path bytes.
    pub fn new_raw_path(path: Vec<u8>, contents: Vec<u8>, loader: Loader) -> Self {
        let encoding = match loader.class_hint() {
            Some(ModuleClass::Text) => Encoding::Utf8,
            _ => Encoding::Binary,
        };
        Self {
            path,
            contents,
            sourcemap: Vec::new(),
            bytecode: Vec::new(),
            module_info: Vec::new(),
            bytecode_origin_path: Vec::new(),
            encoding,
            loader_tag: loader as u8,
            module_format: ModuleFormat::None,
            side: Side::Server,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Write a raw loader tag, including values the parser does not know.
    pub fn with_loader_tag(mut self, tag: u8) -> Self {
        self.loader_tag = tag;
        self
    }

    pub fn with_sourcemap(mut self, sourcemap: Vec<u8>) -> Self {
        self.sourcemap = sourcemap;
        self
    }

    pub fn with_bytecode(mut self, bytecode: Vec<u8>) -> Self {
        self.bytecode = bytecode;
        self
    }

    pub fn with_module_format(mut self, format: ModuleFormat) -> Self {
        self.module_format = format;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }
}

/// Builder for a complete container section.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    modules: Vec<ModuleEntry>,
    layout: DescriptorLayout,
    entry_point_id: u32,
    exec_argv: String,
    flags: GraphFlags,
    leading: Vec<u8>,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            layout: DescriptorLayout::V3,
            entry_point_id: 0,
            exec_argv: String::new(),
            flags: GraphFlags::empty(),
            leading: Vec::new(),
        }
    }

    pub fn module(mut self, entry: ModuleEntry) -> Self {
        self.modules.push(entry);
        self
    }

    pub fn layout(mut self, layout: DescriptorLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Entry point index; not checked against the module count.
    pub fn entry_point(mut self, id: u32) -> Self {
        self.entry_point_id = id;
        self
    }

    pub fn exec_argv(mut self, argv: impl Into<String>) -> Self {
        self.exec_argv = argv.into();
        self
    }

    pub fn flags(mut self, flags: GraphFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Bytes placed before the data region, outside anything the footer
    /// describes.
    pub fn leading_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.leading = bytes;
        self
    }

    /// Serialise the container.
    pub fn build(&self) -> Result<Vec<u8>, BuildError> {
        let mut data = Vec::new();
        let mut records = Vec::with_capacity(self.modules.len() * self.layout.record_size());

        for m in &self.modules {
            let fields = [
                &m.path,
                &m.contents,
                &m.sourcemap,
                &m.bytecode,
                &m.module_info,
                &m.bytecode_origin_path,
            ];
            for bytes in fields.iter().take(self.layout.pointer_count()) {
                let ptr = push_string(&mut data, bytes)?;
                records.extend_from_slice(&ptr.offset.to_le_bytes());
                records.extend_from_slice(&ptr.length.to_le_bytes());
            }
            records.extend_from_slice(&[
                m.encoding as u8,
                m.loader_tag,
                m.module_format.as_u8(),
                m.side.as_u8(),
            ]);
            records.resize(records.len() + self.layout.padding(), 0);
        }

        let exec_argv = push_string(&mut data, self.exec_argv.as_bytes())?;
        let modules_ptr = StringPointer::new(to_u32(data.len())?, to_u32(records.len())?);
        data.extend_from_slice(&records);

        let mut out = Vec::with_capacity(self.leading.len() + data.len() + 48);
        out.extend_from_slice(&self.leading);
        out.extend_from_slice(&data);
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(&modules_ptr.offset.to_le_bytes());
        out.extend_from_slice(&modules_ptr.length.to_le_bytes());
        out.extend_from_slice(&self.entry_point_id.to_le_bytes());
        out.extend_from_slice(&exec_argv.offset.to_le_bytes());
        out.extend_from_slice(&exec_argv.length.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(TRAILER);
        Ok(out)
    }
}

fn to_u32(n: usize) -> Result<u32, BuildError> {
    u32::try_from(n).map_err(|_| BuildError::TooLarge { size: n })
}

fn push_string(data: &mut Vec<u8>, bytes: &[u8]) -> Result<StringPointer, BuildError> {
    if bytes.is_empty() {
        return Ok(StringPointer::default());
    }
    let ptr = StringPointer::new(to_u32(data.len())?, to_u32(bytes.len())?);
    data.extend_from_slice(bytes);
    data.push(0);
    Ok(ptr)
}
