//! Unused dependency detection and removal.
//!
//! This module provides:
//! - Parsing of declared dependencies from manifests
//! - A native source scan and a `cargo machete` backend
//! - Removal through `cargo remove`

mod external;
mod manifest;
mod scanner;

pub use external::{
    parse_machete_output, unused_for_manifest, DependencyRemover, MacheteDetector,
};
pub use manifest::{DeclaredDependency, DependencySection, ManifestDependencies};
pub use scanner::{
    find_reference, source_files, DependencyReport, DependencyScanner, DependencyUsage,
    Detection, Evidence, NativeDetector, RemovalStatus, UsageDetector,
};

use crate::discovery::ProjectRoot;

/// Dependency work performed for each project root during a run.
pub struct DependencyPass {
    scanner: DependencyScanner,
    remove: bool,
    remover: Option<DependencyRemover>,
    dry_run: bool,
}

impl DependencyPass {
    /// Scan only.
    pub fn new(scanner: DependencyScanner, dry_run: bool) -> Self {
        Self {
            scanner,
            remove: false,
            remover: None,
            dry_run,
        }
    }

    /// Also remove unused dependencies with `remover`.
    pub fn with_removal(mut self, remover: DependencyRemover) -> Self {
        self.remove = true;
        self.remover = Some(remover);
        self
    }

    /// Probe external tools once per run.
    ///
    /// A missing detector disables the pass entirely; a missing remover only
    /// disables removal. Each condition produces one run-level warning.
    pub fn prepare(mut self) -> (Option<Self>, Vec<String>) {
        let mut warnings = Vec::new();

        if !self.scanner.detector().is_available() {
            let msg = format!(
                "{} is not available; skipping dependency scan for all projects",
                self.scanner.detector().name()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (None, warnings);
        }

        if self.remove && !self.dry_run {
            if let Some(remover) = &self.remover {
                if !remover.is_available() {
                    let msg = "cargo remove is not available (install cargo-edit or a newer \
                               cargo); unused dependencies will be reported but not removed"
                        .to_string();
                    tracing::warn!("{}", msg);
                    warnings.push(msg);
                    self.remover = None;
                }
            }
        }

        (Some(self), warnings)
    }

    /// Scan one root and apply removal when requested.
    pub fn run(&self, root: &ProjectRoot) -> Vec<DependencyReport> {
        let mut reports = self.scanner.scan(root);
        if !self.remove {
            return reports;
        }

        for report in reports.iter_mut().filter(|r| r.error.is_none()) {
            let manifest = report.manifest.clone();
            for dep in report.dependencies.iter_mut().filter(|d| !d.used) {
                dep.removal = if self.dry_run {
                    Some(RemovalStatus::WouldRemove)
                } else {
                    self.remover.as_ref().map(|remover| {
                        let declared = DeclaredDependency {
                            name: dep.name.clone(),
                            package: dep.package.clone(),
                            section: dep.section,
                        };
                        match remover.remove(&manifest, &declared) {
                            Ok(()) => {
                                tracing::info!(dependency = %dep.name, manifest = %manifest.display(), "Removed unused dependency");
                                RemovalStatus::Removed
                            }
                            Err(error) => {
                                tracing::warn!(dependency = %dep.name, %error, "Failed to remove dependency");
                                RemovalStatus::Failed { error }
                            }
                        }
                    })
                };
            }
        }

        reports
    }
}
