//! Core container types and constants

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic string terminating every module graph container.
pub const TRAILER: &[u8; 16] = b"\n---- Bun! ----\n";

/// Size of the fixed footer record that precedes the trailer.
pub const FOOTER_SIZE: u64 = 32;

/// Footer plus trailer; the minimum size of any container.
pub const TAIL_SIZE: u64 = FOOTER_SIZE + TRAILER.len() as u64;

/// Root prefixes Bun gives embedded module paths (POSIX and Windows builds).
pub const BUNFS_ROOTS: &[&str] = &["/$bunfs/root/", "B:/~BUN/root/", "B:\\~BUN\\root\\"];

/// `{offset, length}` pair addressing bytes inside the data region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPointer {
    pub offset: u32,
    pub length: u32,
}

impl StringPointer {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset, computed without overflow.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True when the pointer lies entirely within a region of `len` bytes.
    pub fn fits_within(&self, len: u64) -> bool {
        self.end() <= len
    }
}

/// Byte range inside a located section, relative to the section start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub offset: u64,
    pub length: u64,
}

impl Region {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// How Bun loaded a module. This is the descriptor's kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loader {
    Jsx = 0,
    Js = 1,
    Ts = 2,
    Tsx = 3,
    Css = 4,
    File = 5,
    Json = 6,
    Jsonc = 7,
    Toml = 8,
    Wasm = 9,
    Napi = 10,
    Base64 = 11,
    Dataurl = 12,
    Text = 13,
    Bunsh = 14,
    Sqlite = 15,
    SqliteEmbedded = 16,
    Html = 17,
    Yaml = 18,
}

impl Loader {
    pub fn from_u8(val: u8) -> Option<Self> {
        Some(match val {
            0 => Loader::Jsx,
            1 => Loader::Js,
            2 => Loader::Ts,
            3 => Loader::Tsx,
            4 => Loader::Css,
            5 => Loader::File,
            6 => Loader::Json,
            7 => Loader::Jsonc,
            8 => Loader::Toml,
            9 => Loader::Wasm,
            10 => Loader::Napi,
            11 => Loader::Base64,
            12 => Loader::Dataurl,
            13 => Loader::Text,
            14 => Loader::Bunsh,
            15 => Loader::Sqlite,
            16 => Loader::SqliteEmbedded,
            17 => Loader::Html,
            18 => Loader::Yaml,
            _ => return None,
        })
    }

    /// Classification implied by the loader alone; `None` when the loader
    /// embeds arbitrary files and the tag says nothing about the bytes.
    pub fn class_hint(&self) -> Option<ModuleClass> {
        match self {
            Loader::Jsx
            | Loader::Js
            | Loader::Ts
            | Loader::Tsx
            | Loader::Css
            | Loader::Json
            | Loader::Jsonc
            | Loader::Toml
            | Loader::Text
            | Loader::Bunsh
            | Loader::Html
            | Loader::Yaml => Some(ModuleClass::Text),
            Loader::Wasm | Loader::Napi | Loader::Sqlite | Loader::SqliteEmbedded => {
                Some(ModuleClass::Binary)
            }
            Loader::File | Loader::Base64 | Loader::Dataurl => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Jsx => "jsx",
            Loader::Js => "js",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
            Loader::Css => "css",
            Loader::File => "file",
            Loader::Json => "json",
            Loader::Jsonc => "jsonc",
            Loader::Toml => "toml",
            Loader::Wasm => "wasm",
            Loader::Napi => "napi",
            Loader::Base64 => "base64",
            Loader::Dataurl => "dataurl",
            Loader::Text => "text",
            Loader::Bunsh => "bunsh",
            Loader::Sqlite => "sqlite",
            Loader::SqliteEmbedded => "sqlite_embedded",
            Loader::Html => "html",
            Loader::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte encoding of a module's stored contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Binary = 0,
    Latin1 = 1,
    Utf8 = 2,
}

impl Encoding {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Encoding::Binary),
            1 => Some(Encoding::Latin1),
            2 => Some(Encoding::Utf8),
            _ => None,
        }
    }
}

/// Module system the bundler emitted for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleFormat {
    None,
    Esm,
    Cjs,
    Other(u8),
}

impl ModuleFormat {
    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => ModuleFormat::None,
            1 => ModuleFormat::Esm,
            2 => ModuleFormat::Cjs,
            other => ModuleFormat::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            ModuleFormat::None => 0,
            ModuleFormat::Esm => 1,
            ModuleFormat::Cjs => 2,
            ModuleFormat::Other(v) => *v,
        }
    }
}

/// Whether a module was bundled for the server or the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Server,
    Client,
    Other(u8),
}

impl Side {
    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => Side::Server,
            1 => Side::Client,
            other => Side::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Side::Server => 0,
            Side::Client => 1,
            Side::Other(v) => *v,
        }
    }
}

/// Text (source) or binary (native add-on, wasm, database) module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleClass {
    Text,
    Binary,
}

impl ModuleClass {
    pub fn is_text(&self) -> bool {
        matches!(self, ModuleClass::Text)
    }
}

impl fmt::Display for ModuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleClass::Text => f.write_str("text"),
            ModuleClass::Binary => f.write_str("binary"),
        }
    }
}

bitflags! {
    /// Runtime flags baked into the executable at compile time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GraphFlags: u32 {
        const DISABLE_DEFAULT_ENV_FILES = 1 << 0;
        const DISABLE_AUTOLOAD_BUNFIG = 1 << 1;
        const DISABLE_AUTOLOAD_TSCONFIG = 1 << 2;
        const DISABLE_AUTOLOAD_PACKAGE_JSON = 1 << 3;
    }
}

/// Width and field set of the per-module descriptor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorLayout {
    /// path, contents, sourcemap
    V1,
    /// V1 padded to an 8-byte boundary
    V1Aligned,
    /// adds bytecode
    V2,
    /// adds module_info and bytecode_origin_path
    V3,
}

impl DescriptorLayout {
    /// Preference order when inferring the layout from the metadata length.
    /// The 28 and 32 byte widths are tried before 36, so a length all three
    /// could divide resolves to the oldest layout.
    pub const INFERENCE_ORDER: [DescriptorLayout; 4] = [
        DescriptorLayout::V3,
        DescriptorLayout::V1,
        DescriptorLayout::V1Aligned,
        DescriptorLayout::V2,
    ];

    /// Number of `StringPointer` fields in the record.
    pub const fn pointer_count(&self) -> usize {
        match self {
            DescriptorLayout::V1 | DescriptorLayout::V1Aligned => 3,
            DescriptorLayout::V2 => 4,
            DescriptorLayout::V3 => 6,
        }
    }

    /// Zero bytes after the tag bytes.
    pub const fn padding(&self) -> usize {
        match self {
            DescriptorLayout::V1Aligned => 4,
            _ => 0,
        }
    }

    /// Record width in bytes: pointers, four tag bytes, then any padding.
    pub const fn record_size(&self) -> usize {
        self.pointer_count() * 8 + 4 + self.padding()
    }

    /// First layout in [`Self::INFERENCE_ORDER`] whose record width divides
    /// `metadata_len`.
    pub fn infer(metadata_len: u64) -> Option<Self> {
        if metadata_len == 0 {
            return Some(DescriptorLayout::V3);
        }
        Self::INFERENCE_ORDER
            .into_iter()
            .find(|layout| metadata_len % layout.record_size() as u64 == 0)
    }
}
