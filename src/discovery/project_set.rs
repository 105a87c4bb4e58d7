//! Deduplication of classified manifests into cleanable project roots.

use super::classifier::Classification;
use super::locator::{ExcludeSet, ARTIFACT_DIR_NAME};
use crate::error::{Result, SweeperError};
use crate::size::dir_size;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Kind of a cleaning unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    Standalone,
    Workspace,
}

/// A deduplicated cleaning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRoot {
    /// Absolute path of the project or workspace root.
    pub path: PathBuf,
    pub kind: ProjectKind,
    /// Artifact directory (`<root>/target`).
    pub artifact_dir: PathBuf,
    /// Discovered manifests belonging to this root, in discovery order.
    pub manifests: Vec<PathBuf>,
    /// Artifact size measured during filtering, if it was measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_size: Option<u64>,
}

impl ProjectRoot {
    pub fn new(path: impl Into<PathBuf>, kind: ProjectKind) -> Self {
        let path = path.into();
        Self {
            artifact_dir: path.join(ARTIFACT_DIR_NAME),
            path,
            kind,
            manifests: Vec::new(),
            artifact_size: None,
        }
    }

    /// Measure (and remember) the artifact size.
    pub fn measure(&mut self) -> u64 {
        let size = dir_size(&self.artifact_dir);
        self.artifact_size = Some(size);
        size
    }
}

/// Builds the minimal, non-overlapping set of project roots.
///
/// Roots keep the order in which they were first seen.
#[derive(Debug, Default)]
pub struct ProjectSetBuilder {
    roots: Vec<ProjectRoot>,
    index: HashMap<PathBuf, usize>,
}

impl ProjectSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified manifest.
    pub fn add(&mut self, manifest: &Path, classification: &Classification) {
        let path = classification.root().to_path_buf();
        let kind = if classification.is_workspace() {
            ProjectKind::Workspace
        } else {
            ProjectKind::Standalone
        };

        let idx = match self.index.get(&path) {
            Some(&idx) => idx,
            None => {
                self.roots.push(ProjectRoot::new(path.clone(), kind));
                self.index.insert(path, self.roots.len() - 1);
                self.roots.len() - 1
            }
        };

        let root = &mut self.roots[idx];
        if kind == ProjectKind::Workspace {
            root.kind = ProjectKind::Workspace;
        }
        root.manifests.push(manifest.to_path_buf());
    }

    /// Drop roots nested inside other roots and return the survivors.
    ///
    /// Outer roots (fewer path segments) win. Two distinct roots that resolve
    /// to the same directory cannot be ordered and fail the build.
    pub fn build(self) -> Result<Vec<ProjectRoot>> {
        let mut by_depth: Vec<usize> = (0..self.roots.len()).collect();
        by_depth.sort_by_key(|&i| self.roots[i].path.components().count());

        let mut resolved: HashMap<PathBuf, usize> = HashMap::new();
        let mut kept: Vec<usize> = Vec::new();

        for i in by_depth {
            let candidate = &self.roots[i];
            let canonical = candidate
                .path
                .canonicalize()
                .unwrap_or_else(|_| candidate.path.clone());

            if let Some(&other) = resolved.get(&canonical) {
                return Err(SweeperError::AmbiguousRoots {
                    first: self.roots[other].path.clone(),
                    second: candidate.path.clone(),
                });
            }

            let outer = kept.iter().copied().find(|&k| {
                let kept_path = &self.roots[k].path;
                candidate.path.starts_with(kept_path) && candidate.path != *kept_path
            });
            match outer {
                Some(k) => {
                    tracing::debug!(
                        root = %candidate.path.display(),
                        owner = %self.roots[k].path.display(),
                        "Dropping nested project root"
                    );
                }
                None => {
                    resolved.insert(canonical, i);
                    kept.push(i);
                }
            }
        }

        let mut keep = vec![false; self.roots.len()];
        for k in kept {
            keep[k] = true;
        }
        Ok(self
            .roots
            .into_iter()
            .zip(keep)
            .filter_map(|(root, keep)| keep.then_some(root))
            .collect())
    }
}

/// Filters applied to the deduplicated set.
#[derive(Debug, Clone, Default)]
pub struct RootFilter {
    /// Exclusion patterns, relative to `base`.
    pub excludes: ExcludeSet,
    pub base: PathBuf,
    /// Minimum artifact size in bytes.
    pub min_size: Option<u64>,
}

impl RootFilter {
    pub fn apply(&self, roots: Vec<ProjectRoot>) -> Vec<ProjectRoot> {
        roots
            .into_iter()
            .filter(|root| {
                let excluded = root
                    .path
                    .strip_prefix(&self.base)
                    .map(|rel| self.excludes.matches(rel))
                    .unwrap_or(false);
                if excluded {
                    tracing::debug!(root = %root.path.display(), "Excluded by pattern");
                }
                !excluded
            })
            .filter_map(|mut root| match self.min_size {
                Some(min) => {
                    let size = root.measure();
                    if size >= min && root.artifact_dir.exists() {
                        Some(root)
                    } else {
                        tracing::debug!(root = %root.path.display(), size, min, "Below size threshold");
                        None
                    }
                }
                None => Some(root),
            })
            .collect()
    }
}
