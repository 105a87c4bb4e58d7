//! Deps command implementation.

use super::{cancel_token, dependency_pass, discover_roots, report, resolve_path};
use crate::cleaner::{Orchestrator, RunSummary};
use crate::cli::DepsArgs;
use crate::config::Config;
use crate::deps::RemovalStatus;
use anyhow::Result;

/// Run the deps command: scan (and optionally remove) without cleaning.
pub fn run(args: DepsArgs, config: &Config, quiet: bool) -> Result<i32> {
    let path = resolve_path(&args.path)?;

    let mut cleaner_config = config.cleaner.clone();
    cleaner_config.exclude_patterns.extend(args.exclude.iter().cloned());
    if let Some(jobs) = args.jobs {
        cleaner_config.jobs = jobs;
    }

    let discovery = discover_roots(&path, &cleaner_config, None)?;
    let pass = dependency_pass(&config.deps, args.remove, false);
    let orchestrator = Orchestrator::scan_only(pass, cleaner_config.jobs)
        .with_cancel(cancel_token())
        .with_warnings(discovery.warnings);

    let summary = orchestrator.run(&discovery.roots, None)?;
    let any_unused = summary
        .dependency_reports
        .iter()
        .any(|r| r.unused().next().is_some());
    if !args.json && !quiet && !any_unused {
        println!("No unused dependencies found.");
    }

    report(&summary, args.json, quiet)?;
    Ok(exit_code(&summary))
}

/// 1 when any manifest could not be scanned or any removal failed.
fn exit_code(summary: &RunSummary) -> i32 {
    if summary.cancelled {
        return 130;
    }
    let failed = summary.dependency_reports.iter().any(|report| {
        report.error.is_some()
            || report
                .dependencies
                .iter()
                .any(|d| matches!(d.removal, Some(RemovalStatus::Failed { .. })))
    });
    i32::from(failed)
}
