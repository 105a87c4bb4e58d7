//! Clean command implementation.

use super::{cancel_token, dependency_pass, discover_roots, report, resolve_path};
use crate::cleaner::{CleanOptions, CleanProgress, Cleaner, Orchestrator};
use crate::cli::CleanArgs;
use crate::config::{CleanerConfig, Config};
use crate::size::parse_size;
use anyhow::{Context, Result};
use humansize::{format_size, BINARY};
use std::io::IsTerminal;

/// Apply command-line overrides on top of the `[cleaner]` config.
pub fn merge_args(config: &CleanerConfig, args: &CleanArgs) -> CleanerConfig {
    let mut merged = config.clone();
    merged.exclude_patterns.extend(args.exclude.iter().cloned());
    merged.include_hidden |= args.include_hidden;
    merged.use_native_clean &= !args.no_native;
    if let Some(jobs) = args.jobs {
        merged.jobs = jobs;
    }
    if args.max_depth.is_some() {
        merged.max_depth = args.max_depth;
    }
    if args.min_size.is_some() {
        merged.min_size = args.min_size.clone();
    }
    merged
}

/// Run the clean command.
pub fn run(args: CleanArgs, config: &Config, quiet: bool) -> Result<i32> {
    let path = resolve_path(&args.path)?;
    let cleaner_config = merge_args(&config.cleaner, &args);
    let min_size = cleaner_config
        .min_size
        .as_deref()
        .map(parse_size)
        .transpose()
        .context("Invalid --min-size")?;

    let verbose_output = !args.json && !quiet;
    if verbose_output {
        println!("Scanning for projects in {}...", path.display());
    }

    let discovery = discover_roots(&path, &cleaner_config, min_size)?;
    if discovery.roots.is_empty() && verbose_output {
        println!("No projects with cleanable artifacts found.");
    }

    let cleaner = Cleaner::new(CleanOptions {
        dry_run: args.dry_run,
        use_native_commands: cleaner_config.use_native_clean,
    });
    let mut orchestrator = Orchestrator::new(cleaner, cleaner_config.jobs)
        .with_cancel(cancel_token())
        .with_warnings(discovery.warnings);

    if args.check_deps || args.remove_deps {
        let pass = dependency_pass(&config.deps, args.remove_deps, args.dry_run);
        orchestrator = orchestrator.with_dependency_pass(pass);
    }

    if verbose_output && !discovery.roots.is_empty() {
        let known: u64 = discovery.roots.iter().filter_map(|r| r.artifact_size).sum();
        let count = discovery.roots.len();
        if known > 0 {
            println!(
                "Found {} project{} ({})",
                count,
                if count == 1 { "" } else { "s" },
                format_size(known, BINARY)
            );
        } else {
            println!("Found {} project{}", count, if count == 1 { "" } else { "s" });
        }
    }

    let show_progress = !args.no_progress
        && !quiet
        && !discovery.roots.is_empty()
        && std::io::stderr().is_terminal();
    let progress = show_progress.then(|| CleanProgress::with_bar(discovery.roots.len()));

    let summary = orchestrator.run(&discovery.roots, progress.as_ref())?;
    if let Some(progress) = &progress {
        progress.finish();
    }

    report(&summary, args.json, quiet)?;
    Ok(summary.exit_code())
}
