//! Human and JSON rendering of run summaries.

use crate::cleaner::{CleanResult, RunSummary};
use crate::deps::{DependencyReport, RemovalStatus};
use crate::discovery::ProjectKind;
use humansize::{format_size, BINARY};
use std::io::{self, Write};

const PATH_WIDTH: usize = 50;

/// Pretty-printed JSON for the whole summary.
pub fn render_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

/// One-line overview of a run.
pub fn summary_line(summary: &RunSummary) -> String {
    let (prefix, verb) = if summary.dry_run {
        ("[DRY RUN] ", "would free")
    } else {
        ("", "freed")
    };
    format!(
        "{}{} cleaned, {} failed, {} skipped, {} {}",
        prefix,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        verb,
        format_size(summary.total_freed, BINARY)
    )
}

/// Table of cleaned roots, unused dependencies and totals.
pub fn write_human<W: Write>(summary: &RunSummary, out: &mut W) -> io::Result<()> {
    if !summary.results.is_empty() {
        if summary.dry_run {
            writeln!(out, "[DRY RUN] Would clean:")?;
        }
        write_results_table(&summary.results, out)?;
    }

    if summary.dependency_reports.iter().any(has_findings) {
        writeln!(out)?;
        writeln!(out, "Unused dependencies:")?;
        for report in summary.dependency_reports.iter().filter(|r| has_findings(r)) {
            write_dependency_report(report, out)?;
        }
    }

    if summary.results.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Results:")?;
    writeln!(out, "  Cleaned: {}", plural(summary.succeeded, "project"))?;
    if summary.failed > 0 {
        writeln!(out, "  Failed:  {}", plural(summary.failed, "project"))?;
    }
    if summary.skipped > 0 {
        writeln!(out, "  Skipped: {}", plural(summary.skipped, "project"))?;
    }
    let label = if summary.dry_run { "Would free:" } else { "Freed:  " };
    writeln!(out, "  {} {}", label, format_size(summary.total_freed, BINARY))
}

/// Per-root failures and run-level warnings.
pub fn write_problems<W: Write>(summary: &RunSummary, err: &mut W) -> io::Result<()> {
    for warning in &summary.warnings {
        writeln!(err, "warning: {}", warning)?;
    }
    for result in summary.results.iter().filter(|r| r.is_failure()) {
        writeln!(
            err,
            "  Error cleaning {}: {}",
            result.root.display(),
            result.error.as_deref().unwrap_or("unknown error")
        )?;
    }
    for report in &summary.dependency_reports {
        if let Some(error) = &report.error {
            writeln!(
                err,
                "  Error scanning {}: {}",
                report.manifest.display(),
                error
            )?;
        }
    }
    Ok(())
}

fn write_results_table<W: Write>(results: &[CleanResult], out: &mut W) -> io::Result<()> {
    writeln!(out, "  {:<10} {:<50} {:>10}", "KIND", "PATH", "FREED")?;
    writeln!(out, "  {}", "─".repeat(72))?;

    for result in results {
        let kind = match result.kind {
            ProjectKind::Standalone => "standalone",
            ProjectKind::Workspace => "workspace",
        };
        let freed = if result.skipped {
            "skipped".to_string()
        } else if result.success {
            format_size(result.freed_bytes, BINARY)
        } else {
            "FAILED".to_string()
        };
        writeln!(
            out,
            "  {:<10} {:<50} {:>10}",
            kind,
            shorten(&result.root.display().to_string(), PATH_WIDTH - 2),
            freed
        )?;
    }
    Ok(())
}

fn has_findings(report: &DependencyReport) -> bool {
    report.unused().next().is_some()
}

fn write_dependency_report<W: Write>(report: &DependencyReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "  {}", report.manifest.display())?;
    for dep in report.unused() {
        let status = match &dep.removal {
            Some(RemovalStatus::Removed) => " (removed)",
            Some(RemovalStatus::WouldRemove) => " (would remove)",
            Some(RemovalStatus::Failed { .. }) => " (removal failed)",
            None => "",
        };
        writeln!(out, "    {} {}{}", dep.name, dep.section, status)?;
    }
    Ok(())
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

/// Keep the tail of long paths so the table stays aligned.
fn shorten(path: &str, max: usize) -> String {
    let len = path.chars().count();
    if len <= max {
        return path.to_string();
    }
    let tail: String = path.chars().skip(len - (max - 3)).collect();
    format!("...{}", tail)
}
