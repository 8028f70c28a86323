//! Writing recovered modules to disk.
//!
//! This sits outside the parsing core: it consumes a decoded [`ModuleGraph`]
//! and never feeds anything back into it. An existing target directory is
//! treated as "already extracted" and left untouched.

use crate::graph::{ExtractedModule, ModuleClass, ModuleGraph};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output directory {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;

/// Writer options.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOptions {
    /// Skip binary modules.
    pub text_only: bool,
    /// Append `.js` to text modules whose path has no extension.
    pub add_js_extension: bool,
    /// Write `manifest.json` next to the modules.
    pub write_manifest: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            text_only: false,
            add_js_extension: true,
            write_manifest: true,
        }
    }
}

/// One module as recorded in the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub index: usize,
    /// Path as stored in the container.
    pub path: String,
    /// Path written, relative to the output directory.
    pub file: String,
    pub kind: ModuleClass,
    pub loader: String,
    pub size: usize,
    pub sha256: String,
    pub entry_point: bool,
    pub stripped_prefix: bool,
}

/// Summary of a decoded graph.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub format: String,
    pub section_offset: u64,
    pub section_size: u64,
    pub layout: String,
    pub module_count: usize,
    pub exec_argv: Option<String>,
    pub flags: u32,
    pub modules: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build the manifest, assigning each module a unique on-disk name.
    pub fn from_graph(graph: &ModuleGraph, options: &WriteOptions) -> Self {
        let mut taken = HashSet::new();
        let modules = graph
            .modules
            .iter()
            .filter(|m| !options.text_only || m.is_text())
            .map(|m| {
                let file = unique_name(output_path(m, options), m.index, &mut taken);
                let bytes = file_bytes(m);
                ManifestEntry {
                    index: m.index,
                    path: m.path.clone(),
                    file: file.to_string_lossy().replace('\\', "/"),
                    kind: m.kind,
                    loader: m.loader.to_string(),
                    size: bytes.len(),
                    sha256: hex::encode(Sha256::digest(&bytes)),
                    entry_point: m.index == graph.footer.entry_point_id as usize,
                    stripped_prefix: m.stripped_prefix,
                }
            })
            .collect();

        Self {
            format: graph.span.format.to_string(),
            section_offset: graph.span.offset,
            section_size: graph.span.size,
            layout: format!("{:?}", graph.footer.layout),
            module_count: graph.footer.module_count,
            exec_argv: graph.exec_argv.clone(),
            flags: graph.footer.flags.bits(),
            modules,
        }
    }
}

/// Relative on-disk path for a module. Only normal components survive, so the
/// result can never climb out of the output directory.
pub fn output_path(module: &ExtractedModule, options: &WriteOptions) -> PathBuf {
    let relative = module.relative_path();
    let mut path: PathBuf = Path::new(&relative)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if path.as_os_str().is_empty() {
        path = PathBuf::from(format!("module_{}", module.index));
    }
    if options.add_js_extension && module.is_text() && path.extension().is_none() {
        path.set_extension("js");
    }
    path
}

/// Bytes written for a module: decoded UTF-8 for text, verbatim otherwise.
pub fn file_bytes(module: &ExtractedModule) -> Cow<'_, [u8]> {
    match module.text() {
        Some(Cow::Borrowed(text)) => Cow::Borrowed(text.as_bytes()),
        Some(Cow::Owned(text)) => Cow::Owned(text.into_bytes()),
        None => Cow::Borrowed(&module.content),
    }
}

/// First free name among `path`, `path.{index}`, `path.{index}.1`, ...
fn unique_name(path: PathBuf, index: usize, taken: &mut HashSet<PathBuf>) -> PathBuf {
    if taken.insert(path.clone()) {
        return path;
    }
    let base = path.into_os_string();
    let mut attempt = 0usize;
    loop {
        let mut name = base.clone();
        if attempt == 0 {
            name.push(format!(".{index}"));
        } else {
            name.push(format!(".{index}.{attempt}"));
        }
        let candidate = PathBuf::from(name);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        attempt += 1;
    }
}

/// Write `graph` under `out_dir`, which must not exist yet.
pub fn write_graph(graph: &ModuleGraph, out_dir: &Path, options: &WriteOptions) -> Result<Manifest> {
    if out_dir.exists() {
        return Err(OutputError::AlreadyExists(out_dir.to_path_buf()));
    }
    create_dir(out_dir)?;

    let manifest = Manifest::from_graph(graph, options);
    // Manifest entries come from the same filtered walk, so zipping pairs them up.
    let written = graph
        .modules
        .iter()
        .filter(|m| !options.text_only || m.is_text())
        .zip(&manifest.modules);

    for (module, entry) in written {
        let target = out_dir.join(&entry.file);
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        write_file(&target, &file_bytes(module))?;
        debug!(file = %entry.file, size = entry.size, kind = %entry.kind, "Wrote module");
    }

    if options.write_manifest {
        let json = serde_json::to_vec_pretty(&manifest)?;
        write_file(&out_dir.join(MANIFEST_FILE), &json)?;
    }

    info!(
        dir = %out_dir.display(),
        modules = manifest.modules.len(),
        "Wrote extracted modules"
    );
    Ok(manifest)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
