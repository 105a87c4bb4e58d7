//! Subcommand implementations.
//!
//! Each command returns the process exit status; setup errors are returned
//! as `Err` and reported by `main`.

pub mod clean;
pub mod deps;

use crate::cleaner::{CancelToken, RunSummary};
use crate::config::{CleanerConfig, DepsConfig};
use crate::deps::{
    DependencyPass, DependencyRemover, DependencyScanner, MacheteDetector, NativeDetector,
    UsageDetector,
};
use crate::discovery::{self, CargoMetadata, Discovery, LocatorOptions, MetadataCache};
use crate::error::SweeperError;
use crate::output;
use crate::signals::install_cancel_handlers;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Resolve the directory to scan to an absolute path.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(SweeperError::PathNotFound(path.to_path_buf()).into());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))
}

/// Find project roots under `path` using `cargo metadata` for classification.
fn discover_roots(
    path: &Path,
    cleaner: &CleanerConfig,
    min_size: Option<u64>,
) -> Result<Discovery> {
    let options = LocatorOptions {
        exclude_patterns: cleaner.exclude_patterns.clone(),
        include_hidden: cleaner.include_hidden,
        follow_symlinks: cleaner.follow_symlinks,
        max_depth: cleaner.max_depth,
    };
    let query = CargoMetadata::new();
    let cache = MetadataCache::new();

    discovery::discover(path, options, &query, &cache, min_size)
        .with_context(|| format!("Project discovery failed under {}", path.display()))
}

/// Build the dependency pass described by the `[deps]` config.
fn dependency_pass(config: &DepsConfig, remove: bool, dry_run: bool) -> DependencyPass {
    let detector: Box<dyn UsageDetector> = match config.backend.as_str() {
        "cargo-machete" => Box::new(MacheteDetector::new()),
        _ => Box::new(NativeDetector),
    };
    let scanner = DependencyScanner::new(detector)
        .with_ignore(config.ignore.iter().cloned())
        .with_feature_usage(config.scan_manifest_features);

    let pass = DependencyPass::new(scanner, dry_run);
    if remove {
        pass.with_removal(DependencyRemover::new())
    } else {
        pass
    }
}

/// Cancellation wired to SIGINT/SIGTERM, or an inert token if handlers
/// cannot be installed.
fn cancel_token() -> CancelToken {
    install_cancel_handlers().unwrap_or_else(|e| {
        tracing::warn!("Failed to install signal handlers: {}", e);
        CancelToken::new()
    })
}

/// Print a summary: problems on stderr, the report on stdout.
fn report(summary: &RunSummary, json: bool, quiet: bool) -> Result<()> {
    output::write_problems(summary, &mut io::stderr().lock())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        writeln!(out, "{}", output::render_json(summary)?)?;
    } else if quiet && !summary.results.is_empty() {
        writeln!(out, "{}", output::summary_line(summary))?;
    } else {
        output::write_human(summary, &mut out)?;
    }
    Ok(())
}
