//! Lazy manifest discovery over a directory tree.

use crate::error::{Result, SweeperError};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File name that marks a Cargo project.
pub const MANIFEST_NAME: &str = "Cargo.toml";

/// Conventional artifact directory name next to a manifest.
pub const ARTIFACT_DIR_NAME: &str = "target";

/// Options for manifest discovery.
#[derive(Debug, Clone, Default)]
pub struct LocatorOptions {
    /// Glob patterns matched against paths relative to the scan root.
    pub exclude_patterns: Vec<String>,
    /// Descend into directories whose name starts with a dot.
    pub include_hidden: bool,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Maximum directory depth to scan.
    pub max_depth: Option<usize>,
}

/// Compiled exclusion patterns.
///
/// A pattern is matched against the entry's path relative to the scan root.
/// Patterns without a `/` also match any single directory name, so `vendor`
/// prunes every `vendor/` directory in the tree.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| SweeperError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether `relative` (a path relative to the scan root) is excluded.
    pub fn matches(&self, relative: &Path) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        let rel = relative.to_string_lossy();
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.patterns.iter().any(|p| {
            p.matches(&rel) || (!p.as_str().contains('/') && p.matches(&name))
        })
    }
}

/// Walks a directory tree and yields manifest paths.
///
/// Excluded subtrees are pruned before they are entered. Directories are
/// visited in lexical order, so the output is stable for a given tree.
pub struct ManifestLocator {
    root: PathBuf,
    options: LocatorOptions,
    excludes: ExcludeSet,
}

impl ManifestLocator {
    pub fn new(root: impl Into<PathBuf>, options: LocatorOptions) -> Result<Self> {
        let excludes = ExcludeSet::new(&options.exclude_patterns)?;
        Ok(Self {
            root: root.into(),
            options,
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn excludes(&self) -> &ExcludeSet {
        &self.excludes
    }

    /// Start a traversal.
    pub fn manifests(&self) -> ManifestIter<'_> {
        let mut walker = WalkDir::new(&self.root)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.options.max_depth {
            // Manifests sit one level below the deepest visited directory.
            walker = walker.max_depth(depth.saturating_add(1));
        }

        let locator: &ManifestLocator = self;
        let filter: Box<dyn FnMut(&DirEntry) -> bool + '_> =
            Box::new(move |entry| locator.should_descend(entry));

        ManifestIter {
            inner: walker.into_iter().filter_entry(filter),
            errors: Vec::new(),
        }
    }

    /// Decide whether a directory entry is visited at all.
    fn should_descend(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if !self.options.include_hidden && name.starts_with('.') {
            return false;
        }

        // Artifact directories may hold packaged copies of manifests.
        if name == ARTIFACT_DIR_NAME
            && entry
                .path()
                .parent()
                .is_some_and(|p| p.join(MANIFEST_NAME).is_file())
        {
            return false;
        }

        if !self.excludes.is_empty() {
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                if self.excludes.matches(rel) {
                    tracing::debug!(path = %entry.path().display(), "Pruning excluded directory");
                    return false;
                }
            }
        }

        true
    }
}

type EntryFilter<'a> = Box<dyn FnMut(&DirEntry) -> bool + 'a>;

/// Iterator over discovered manifests.
///
/// Unreadable directories do not stop the traversal; their errors are
/// collected and available through [`ManifestIter::errors`].
pub struct ManifestIter<'a> {
    inner: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter<'a>>,
    errors: Vec<String>,
}

impl ManifestIter<'_> {
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl Iterator for ManifestIter<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.file_type().is_file() && entry.file_name() == MANIFEST_NAME {
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    tracing::warn!(%path, error = %e, "Skipping unreadable entry");
                    self.errors.push(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch_manifest(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_NAME), "[package]").unwrap();
    }

    fn collect(root: &Path, options: LocatorOptions) -> Vec<PathBuf> {
        let locator = ManifestLocator::new(root, options).unwrap();
        locator
            .manifests()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn test_finds_manifests_in_lexical_order() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("zeta"));
        touch_manifest(&tmp.path().join("alpha"));
        touch_manifest(&tmp.path().join("mid/inner"));

        let found = collect(tmp.path(), LocatorOptions::default());

        assert_eq!(
            found,
            vec![
                PathBuf::from("alpha/Cargo.toml"),
                PathBuf::from("mid/inner/Cargo.toml"),
                PathBuf::from("zeta/Cargo.toml"),
            ]
        );
    }

    #[test]
    fn test_hidden_directories_skipped_by_default() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join(".cache/registry/crate"));
        touch_manifest(&tmp.path().join("visible"));

        let found = collect(tmp.path(), LocatorOptions::default());
        assert_eq!(found, vec![PathBuf::from("visible/Cargo.toml")]);

        let found = collect(
            tmp.path(),
            LocatorOptions {
                include_hidden: true,
                ..Default::default()
            },
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_exclude_prunes_subtree() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("vendor/a"));
        touch_manifest(&tmp.path().join("deep/vendor/b"));
        touch_manifest(&tmp.path().join("app"));

        let found = collect(
            tmp.path(),
            LocatorOptions {
                exclude_patterns: vec!["vendor".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(found, vec![PathBuf::from("app/Cargo.toml")]);
    }

    #[test]
    fn test_exclude_relative_glob() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("projects/libs/util"));
        touch_manifest(&tmp.path().join("projects/app"));
        touch_manifest(&tmp.path().join("other/libs/keep"));

        let found = collect(
            tmp.path(),
            LocatorOptions {
                exclude_patterns: vec!["projects/libs".to_string()],
                ..Default::default()
            },
        );
        assert_eq!(
            found,
            vec![
                PathBuf::from("other/libs/keep/Cargo.toml"),
                PathBuf::from("projects/app/Cargo.toml"),
            ]
        );
    }

    #[test]
    fn test_artifact_directory_not_descended() {
        let tmp = TempDir::new().unwrap();
        let proj = tmp.path().join("app");
        touch_manifest(&proj);
        touch_manifest(&proj.join("target/package/app-0.1.0"));

        let found = collect(tmp.path(), LocatorOptions::default());
        assert_eq!(found, vec![PathBuf::from("app/Cargo.toml")]);
    }

    #[test]
    fn test_target_without_manifest_sibling_is_scanned() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("target/real"));

        let found = collect(tmp.path(), LocatorOptions::default());
        assert_eq!(found, vec![PathBuf::from("target/real/Cargo.toml")]);
    }

    #[test]
    fn test_max_depth() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("a"));
        touch_manifest(&tmp.path().join("a/b/c/d"));

        let found = collect(
            tmp.path(),
            LocatorOptions {
                max_depth: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(found, vec![PathBuf::from("a/Cargo.toml")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_not_followed_by_default() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch_manifest(&outside.path().join("linked"));
        touch_manifest(&tmp.path().join("local"));
        std::os::unix::fs::symlink(outside.path().join("linked"), tmp.path().join("link"))
            .unwrap();

        let found = collect(tmp.path(), LocatorOptions::default());
        assert_eq!(found, vec![PathBuf::from("local/Cargo.toml")]);

        let found = collect(
            tmp.path(),
            LocatorOptions {
                follow_symlinks: true,
                ..Default::default()
            },
        );
        assert_eq!(
            found,
            vec![
                PathBuf::from("link/Cargo.toml"),
                PathBuf::from("local/Cargo.toml"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_does_not_stop_traversal() {
        let tmp = TempDir::new().unwrap();
        touch_manifest(&tmp.path().join("a"));
        touch_manifest(&tmp.path().join("b"));
        // Followed, this link loops back to its own parent.
        std::os::unix::fs::symlink(tmp.path().join("a"), tmp.path().join("a/again")).unwrap();

        let locator = ManifestLocator::new(
            tmp.path(),
            LocatorOptions {
                follow_symlinks: true,
                ..Default::default()
            },
        )
        .unwrap();
        let mut manifests = locator.manifests();
        let found: Vec<_> = manifests
            .by_ref()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            found,
            vec![PathBuf::from("a/Cargo.toml"), PathBuf::from("b/Cargo.toml")]
        );
        assert_eq!(manifests.errors().len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = ManifestLocator::new(
            tmp.path(),
            LocatorOptions {
                exclude_patterns: vec!["[unclosed".to_string()],
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(SweeperError::InvalidPattern { .. })));
    }

    #[test]
    fn test_exclude_set_matches() {
        let set = ExcludeSet::new(&["**/fixtures".to_string(), "build".to_string()]).unwrap();
        assert!(set.matches(Path::new("crates/a/fixtures")));
        assert!(set.matches(Path::new("x/build")));
        assert!(!set.matches(Path::new("crates/a/src")));
        assert!(!set.matches(Path::new("")));
    }
}
