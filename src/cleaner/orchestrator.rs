//! Orchestrator for parallel cleaning operations.

use crate::cleaner::executor::{CleanResult, Cleaner};
use crate::deps::{DependencyPass, DependencyReport};
use crate::discovery::ProjectRoot;
use crate::error::{Result, SweeperError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Reason recorded for roots that were never started.
const CANCELLED_REASON: &str = "cancelled before start";

/// Progress tracker for cleaning operations.
pub struct CleanProgress {
    /// Total number of roots to process.
    pub total: usize,
    completed: AtomicUsize,
    current_root: Mutex<Option<String>>,
    bar: Option<ProgressBar>,
}

impl CleanProgress {
    /// Create a tracker without any rendering.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            current_root: Mutex::new(None),
            bar: None,
        }
    }

    /// Create a tracker that drives a progress bar on stderr.
    pub fn with_bar(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self {
            bar: Some(bar),
            ..Self::new(total)
        }
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn set_current(&self, name: String) {
        if let Some(bar) = &self.bar {
            bar.set_message(name.clone());
        }
        *self.current_root.lock().unwrap_or_else(|e| e.into_inner()) = Some(name);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Option<String> {
        self.current_root
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove the progress bar from the terminal.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Shared cancellation flag checked before each root is started.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag, e.g. one set by a signal handler.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Roots considered.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Roots never started because the run was cancelled.
    pub skipped: usize,
    /// Bytes freed by succeeded roots.
    pub total_freed: u64,
    pub dry_run: bool,
    pub cancelled: bool,
    /// One result per cleaned root, in discovery order.
    pub results: Vec<CleanResult>,
    /// Dependency reports, in discovery order.
    pub dependency_reports: Vec<DependencyReport>,
    /// Run-level problems such as missing external tools.
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Aggregate per-root results.
    pub fn from_results(
        total: usize,
        results: Vec<CleanResult>,
        dependency_reports: Vec<DependencyReport>,
        dry_run: bool,
    ) -> Self {
        let mut summary = Self {
            total,
            dry_run,
            dependency_reports,
            ..Self::default()
        };

        for result in &results {
            if result.skipped {
                summary.skipped += 1;
            } else if result.success {
                summary.succeeded += 1;
                summary.total_freed += result.freed_bytes;
            } else {
                summary.failed += 1;
            }
        }
        summary.cancelled = summary.skipped > 0;
        summary.results = results;
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit status: 130 when cancelled, 1 when any root failed.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            130
        } else if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Everything produced for one root.
struct RootOutcome {
    result: Option<CleanResult>,
    reports: Vec<DependencyReport>,
    skipped: bool,
}

/// Runs the per-root work of a run across a worker pool.
pub struct Orchestrator {
    cleaner: Option<Cleaner>,
    deps: Option<DependencyPass>,
    jobs: usize,
    cancel: CancelToken,
    warnings: Vec<String>,
}

impl Orchestrator {
    /// Clean every root. `jobs = 0` uses the available parallelism.
    pub fn new(cleaner: Cleaner, jobs: usize) -> Self {
        Self {
            cleaner: Some(cleaner),
            deps: None,
            jobs,
            cancel: CancelToken::new(),
            warnings: Vec::new(),
        }
    }

    /// Dependency scanning only; nothing is cleaned.
    pub fn scan_only(pass: DependencyPass, jobs: usize) -> Self {
        Self {
            cleaner: None,
            deps: None,
            jobs,
            cancel: CancelToken::new(),
            warnings: Vec::new(),
        }
        .with_dependency_pass(pass)
    }

    /// Run a dependency pass for each root. External tools are probed here,
    /// once for the whole run.
    pub fn with_dependency_pass(mut self, pass: DependencyPass) -> Self {
        let (pass, warnings) = pass.prepare();
        self.deps = pass;
        self.warnings.extend(warnings);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Add run-level warnings collected earlier (e.g. during discovery).
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn threads(&self) -> usize {
        if self.jobs > 0 {
            return self.jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn is_dry_run(&self) -> bool {
        self.cleaner.as_ref().is_some_and(Cleaner::is_dry_run)
    }

    /// Process every root and aggregate the outcome.
    ///
    /// Per-root failures are captured in the summary; only a failure to start
    /// the worker pool is returned as an error.
    pub fn run(
        &self,
        roots: &[ProjectRoot],
        progress: Option<&CleanProgress>,
    ) -> Result<RunSummary> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads())
            .build()
            .map_err(|e| SweeperError::WorkerPool(e.to_string()))?;

        tracing::debug!(
            roots = roots.len(),
            threads = pool.current_num_threads(),
            "Starting run"
        );

        let dry_run = self.is_dry_run();
        let outcomes: Vec<RootOutcome> = pool.install(|| {
            roots
                .par_iter()
                .map(|root| {
                    if self.cancel.is_cancelled() {
                        tracing::debug!(root = %root.path.display(), "Skipping root after cancellation");
                        return RootOutcome {
                            result: self
                                .cleaner
                                .as_ref()
                                .map(|_| CleanResult::skipped(root, CANCELLED_REASON, dry_run)),
                            reports: Vec::new(),
                            skipped: true,
                        };
                    }

                    if let Some(progress) = progress {
                        progress.set_current(root.path.display().to_string());
                    }

                    let reports = self
                        .deps
                        .as_ref()
                        .map(|pass| pass.run(root))
                        .unwrap_or_default();
                    let result = self.cleaner.as_ref().map(|cleaner| cleaner.clean(root));

                    if let Some(progress) = progress {
                        progress.increment();
                    }

                    RootOutcome {
                        result,
                        reports,
                        skipped: false,
                    }
                })
                .collect()
        });

        let mut results = Vec::with_capacity(roots.len());
        let mut reports = Vec::new();
        let mut skipped = 0;
        for outcome in outcomes {
            results.extend(outcome.result);
            reports.extend(outcome.reports);
            skipped += usize::from(outcome.skipped);
        }

        let mut summary = RunSummary::from_results(roots.len(), results, reports, dry_run);
        // A scan-only run has no clean results to carry its skipped roots.
        summary.skipped = skipped;
        summary.cancelled = skipped > 0;
        summary.warnings = self.warnings.clone();
        Ok(summary)
    }
}
