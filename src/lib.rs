//! Recover the modules packed into a Bun single-file executable.
//!
//! `bun build --compile` appends a "standalone module graph" to the runtime
//! binary: a container of source files, native add-ons and assets addressed
//! through a footer and a fixed-width index. This crate finds that container
//! inside an ELF, Mach-O or PE image and decodes it back into named modules.
//!
//! ```no_run
//! use bunfs_extract::{extract_file, ExtractConfig};
//!
//! let config = ExtractConfig::new("/usr/local/bin/my-app").with_skip_binary_modules(true);
//! let graph = extract_file(&config)?;
//! for module in &graph.modules {
//!     println!("{} ({} bytes)", module.relative_path(), module.content.len());
//! }
//! # Ok::<(), bunfs_extract::ExtractError>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod io;
pub mod locate;
pub mod logging;
pub mod output;

pub use config::{ExtractConfig, GraphConfig};
pub use error::{ExtractError, Result, Stage};
pub use graph::{ExtractedModule, ModuleClass, ModuleGraph};
pub use io::{ExecutableImage, IOLimits};
pub use locate::{locate, HostFormat, SectionSpan};

use tracing::debug;

/// Locate and decode the module graph inside an already loaded image.
pub fn extract_image(image: &ExecutableImage, config: &GraphConfig) -> Result<ModuleGraph> {
    let span = locate::locate(image)?;
    ModuleGraph::decode(image, span, config)
}

/// Read `config.source_path` once and run the whole pipeline over it.
///
/// With `skip_binary_modules` set, binary modules are dropped from the result
/// after extraction; the remaining modules keep their index order.
pub fn extract_file(config: &ExtractConfig) -> Result<ModuleGraph> {
    let span = crate::span_trace!("extract_file", path = %config.source_path.display());
    let _enter = span.enter();

    let image = ExecutableImage::read(&config.source_path, &config.io)?;
    let mut graph = extract_image(&image, &config.graph)?;
    if config.skip_binary_modules {
        let before = graph.modules.len();
        graph.retain_text();
        debug!(
            skipped = before - graph.modules.len(),
            "Dropped binary modules"
        );
    }
    Ok(graph)
}
