use anyhow::{Context, Result};
use bunfs_extract::logging::{init_tracing, init_tracing_json};
use bunfs_extract::output::{write_graph, Manifest, WriteOptions};
use bunfs_extract::{extract_file, ExtractConfig};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "bunfs-extract")]
#[command(about = "Extract the embedded module graph from a Bun-compiled executable")]
struct Cli {
    /// Executable to read; symlinks are resolved and the target's file name
    /// is used as the version directory.
    #[arg(long, value_name = "PATH")]
    binary: PathBuf,

    /// Parent directory for extracted versions.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Only extract text modules (skip .node/.wasm binaries).
    #[arg(long)]
    text_only: bool,

    /// Print the module listing as JSON instead of writing files.
    #[arg(long)]
    list: bool,

    /// Keep extensionless text module names as they are.
    #[arg(long)]
    no_js_extension: bool,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        init_tracing_json("warn");
    } else {
        init_tracing("warn");
    }

    let resolved = fs::canonicalize(&cli.binary)
        .with_context(|| format!("Binary not found: {}", cli.binary.display()))?;
    let version = version_of(&resolved);

    let mut config = load_config(cli.config.as_deref())?;
    config.source_path = resolved.clone();
    config.skip_binary_modules |= cli.text_only;

    let options = WriteOptions {
        text_only: config.skip_binary_modules,
        add_js_extension: !cli.no_js_extension,
        write_manifest: true,
    };
    let out_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("bunfs-extract"))
        .join(&version);

    eprintln!("Binary: {}", resolved.display());
    eprintln!("Version: {version}");

    if !cli.list && out_dir.exists() {
        println!("Output already exists: {}", out_dir.display());
        println!("Remove it first to re-extract, or use a different --output-dir");
        return Ok(());
    }

    let graph = match extract_file(&config) {
        Ok(graph) => graph,
        Err(e) if e.is_container_missing() => {
            println!("Nothing to extract: {e}");
            return Ok(());
        }
        Err(e) => {
            let stage = e.stage();
            let e = bunfs_extract::log_error!(e, "extraction");
            return Err(anyhow::Error::new(e).context(format!("extraction failed at {stage} stage")));
        }
    };
    eprintln!(
        "{} section: offset={}, size={} bytes",
        graph.span.format, graph.span.offset, graph.span.size
    );
    eprintln!("Found {} modules", graph.footer.module_count);

    if cli.list {
        let manifest = Manifest::from_graph(&graph, &options);
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let manifest = write_graph(&graph, &out_dir, &options)
        .with_context(|| format!("failed to write {}", out_dir.display()))?;
    for entry in &manifest.modules {
        println!("  {:40} {:>12} bytes  [{}]", entry.file, entry.size, entry.kind);
    }
    println!("\nExtracted to: {}", out_dir.display());
    if let Some(entry) = manifest.modules.iter().find(|e| e.entry_point) {
        println!("Main source: {}", out_dir.join(&entry.file).display());
    }
    Ok(())
}

fn version_of(resolved: &Path) -> String {
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn load_config(path: Option<&Path>) -> Result<ExtractConfig> {
    let Some(path) = path else {
        return Ok(ExtractConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ExtractConfig::from_json_str(&json)
        .with_context(|| format!("invalid config {}", path.display()))
}
