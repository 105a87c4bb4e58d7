//! Executor for cleaning project artifacts.

use crate::cleaner::strategy::{CleanStrategy, StrategyKind, StrategyOutcome};
use crate::discovery::{ProjectKind, ProjectRoot};
use crate::size::dir_size;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Result of cleaning one project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanResult {
    pub root: PathBuf,
    pub kind: ProjectKind,
    pub success: bool,
    /// Never started because the run was cancelled.
    pub skipped: bool,
    pub freed_bytes: u64,
    /// Artifact size before cleaning.
    pub size_before: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub strategy: StrategyKind,
    pub dry_run: bool,
}

impl CleanResult {
    fn success(root: &ProjectRoot, size_before: u64, freed: u64, strategy: StrategyKind) -> Self {
        Self {
            root: root.path.clone(),
            kind: root.kind,
            success: true,
            skipped: false,
            freed_bytes: freed,
            size_before,
            error: None,
            strategy,
            dry_run: false,
        }
    }

    /// A failure recorded without touching the project.
    pub fn failed(root: &ProjectRoot, error: impl Into<String>) -> Self {
        Self {
            root: root.path.clone(),
            kind: root.kind,
            success: false,
            skipped: false,
            freed_bytes: 0,
            size_before: 0,
            error: Some(error.into()),
            strategy: StrategyKind::None,
            dry_run: false,
        }
    }

    /// A root that was never started.
    pub fn skipped(root: &ProjectRoot, reason: impl Into<String>, dry_run: bool) -> Self {
        Self {
            skipped: true,
            dry_run,
            ..Self::failed(root, reason)
        }
    }

    /// Counts against the exit status.
    pub fn is_failure(&self) -> bool {
        !self.success && !self.skipped
    }
}

/// Options for the clean executor.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    /// If true, don't actually delete anything.
    pub dry_run: bool,
    /// If true, try native clean commands before direct deletion.
    pub use_native_commands: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            use_native_commands: true,
        }
    }
}

/// Cleans a project root by trying strategies in order.
#[derive(Debug, Clone)]
pub struct Cleaner {
    strategies: Vec<CleanStrategy>,
    dry_run: bool,
}

impl Cleaner {
    /// `cargo clean` first (when enabled), then direct deletion.
    pub fn new(options: CleanOptions) -> Self {
        let mut strategies = Vec::new();
        if options.use_native_commands {
            strategies.push(CleanStrategy::cargo_clean());
        }
        strategies.push(CleanStrategy::RemoveDir);
        Self::with_strategies(strategies, options.dry_run)
    }

    pub fn with_strategies(strategies: Vec<CleanStrategy>, dry_run: bool) -> Self {
        Self {
            strategies,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn strategies(&self) -> &[CleanStrategy] {
        &self.strategies
    }

    /// Clean a single project root.
    pub fn clean(&self, root: &ProjectRoot) -> CleanResult {
        let untouched = || {
            let mut result = CleanResult::success(root, 0, 0, StrategyKind::None);
            result.dry_run = self.dry_run;
            result
        };
        match fs::symlink_metadata(&root.artifact_dir) {
            Ok(meta) if meta.file_type().is_symlink() => {
                // The linked tree belongs to whatever it points at.
                tracing::warn!(
                    "{} is a symbolic link, leaving it alone",
                    root.artifact_dir.display()
                );
                return untouched();
            }
            Ok(_) => {}
            Err(_) => return untouched(),
        }

        let size_before = dir_size(&root.artifact_dir);

        if self.dry_run {
            let mut result =
                CleanResult::success(root, size_before, size_before, StrategyKind::None);
            result.dry_run = true;
            return result;
        }

        let mut failures = Vec::new();
        for (position, strategy) in self.strategies.iter().enumerate() {
            let kind = if position == 0 {
                StrategyKind::Primary
            } else {
                StrategyKind::Fallback
            };

            let outcome = match strategy.run(&root.path, &root.artifact_dir) {
                StrategyOutcome::Done { .. }
                    if fs::symlink_metadata(&root.artifact_dir).is_ok() =>
                {
                    StrategyOutcome::Failed {
                        detail: format!("left {} in place", root.artifact_dir.display()),
                    }
                }
                outcome => outcome,
            };

            match outcome {
                StrategyOutcome::Done { detail } => {
                    let size_after = dir_size(&root.artifact_dir);
                    let freed = size_before.saturating_sub(size_after);
                    tracing::info!(
                        root = %root.path.display(),
                        strategy = %strategy.name(),
                        freed,
                        "Cleaned project"
                    );
                    tracing::trace!(%detail, "Strategy output");
                    return CleanResult::success(root, size_before, freed, kind);
                }
                StrategyOutcome::Failed { detail } => {
                    tracing::warn!(
                        "{} failed for {}: {}",
                        strategy.name(),
                        root.path.display(),
                        detail
                    );
                    failures.push(format!("{}: {}", strategy.name(), detail));
                }
            }
        }

        let mut result = CleanResult::failed(root, failures.join("; "));
        result.size_before = size_before;
        result
    }
}
