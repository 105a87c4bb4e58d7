//! Discovery of cleanable project roots.
//!
//! This module provides:
//! - Manifest discovery with pruning exclusions
//! - Workspace classification backed by a metadata query
//! - Deduplication into non-overlapping project roots

mod classifier;
mod locator;
mod project_set;

pub use classifier::{
    CargoMetadata, Classification, MetadataCache, MetadataQuery, StaticMetadata,
    WorkspaceClassifier, WorkspaceMetadata,
};
pub use locator::{
    ExcludeSet, LocatorOptions, ManifestIter, ManifestLocator, ARTIFACT_DIR_NAME, MANIFEST_NAME,
};
pub use project_set::{ProjectKind, ProjectRoot, ProjectSetBuilder, RootFilter};

use crate::error::Result;
use std::path::Path;

/// Outcome of a discovery pass.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Deduplicated roots in discovery order.
    pub roots: Vec<ProjectRoot>,
    /// Non-fatal problems (unreadable directories, metadata fallbacks).
    pub warnings: Vec<String>,
}

/// Discover project roots under `start`.
///
/// Exclusion patterns are applied twice: while walking (pruning) and again
/// over the deduplicated set, together with `min_size`.
pub fn discover(
    start: &Path,
    options: LocatorOptions,
    query: &dyn MetadataQuery,
    cache: &MetadataCache,
    min_size: Option<u64>,
) -> Result<Discovery> {
    let locator = ManifestLocator::new(start, options)?;
    let classifier = WorkspaceClassifier::new(query, cache);
    let mut builder = ProjectSetBuilder::new();

    let mut manifests = locator.manifests();
    for manifest in manifests.by_ref() {
        let classification = classifier.classify(&manifest)?;
        tracing::trace!(manifest = %manifest.display(), ?classification, "Classified manifest");
        builder.add(&manifest, &classification);
    }

    let mut warnings: Vec<String> = manifests
        .errors()
        .iter()
        .map(|e| format!("Unreadable directory skipped: {}", e))
        .collect();
    warnings.extend(classifier.warnings());

    let roots = builder.build()?;
    let filter = RootFilter {
        excludes: locator.excludes().clone(),
        base: start.to_path_buf(),
        min_size,
    };
    let roots = filter.apply(roots);

    tracing::info!(count = roots.len(), "Discovered project roots");
    Ok(Discovery { roots, warnings })
}
