//! Module classifier: text source or binary payload.

use crate::graph::types::{Loader, ModuleClass};

/// Suffixes that always denote binary payloads.
const BINARY_SUFFIXES: &[&str] = &[".node", ".wasm"];

/// Suffixes that identify source text when the loader is not conclusive.
const TEXT_SUFFIXES: &[&str] = &[
    ".js", ".mjs", ".cjs", ".jsx", ".ts", ".mts", ".cts", ".tsx", ".json", ".jsonc", ".css",
    ".html", ".htm", ".txt", ".md", ".toml", ".yaml", ".yml", ".sh",
];

/// Classify a module from its loader tag, falling back to the path suffix
/// when the loader embeds arbitrary files. Anything unconfirmed is binary.
pub fn classify(loader: Loader, path: &str) -> ModuleClass {
    if let Some(class) = loader.class_hint() {
        return class;
    }
    classify_by_suffix(path)
}

fn classify_by_suffix(path: &str) -> ModuleClass {
    let lower = path.to_ascii_lowercase();
    if BINARY_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        ModuleClass::Binary
    } else if TEXT_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        ModuleClass::Text
    } else {
        ModuleClass::Binary
    }
}
