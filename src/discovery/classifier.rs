//! Workspace classification of discovered manifests.

use crate::error::{Result, SweeperError};
use cargo_metadata::MetadataCommand;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// What a metadata query reports about a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMetadata {
    /// Root directory of the workspace that owns the manifest, if any.
    pub workspace_root: Option<PathBuf>,
    /// Manifest paths of every package in that workspace.
    pub member_manifests: Vec<PathBuf>,
}

/// Source of workspace metadata for a manifest.
pub trait MetadataQuery: Send + Sync {
    fn query(&self, manifest: &Path) -> Result<WorkspaceMetadata>;
}

/// Queries `cargo metadata --no-deps` for each manifest.
#[derive(Debug, Clone)]
pub struct CargoMetadata {
    cargo: Option<PathBuf>,
}

impl CargoMetadata {
    /// Use the cargo binary that invoked us, or `cargo` from `PATH`.
    pub fn new() -> Self {
        Self {
            cargo: std::env::var_os("CARGO").map(PathBuf::from),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            cargo: Some(program.into()),
        }
    }
}

impl Default for CargoMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataQuery for CargoMetadata {
    fn query(&self, manifest: &Path) -> Result<WorkspaceMetadata> {
        let mut command = MetadataCommand::new();
        command.no_deps().manifest_path(manifest);
        if let Some(cargo) = &self.cargo {
            command.cargo_path(cargo);
        }

        let metadata = command.exec().map_err(|e| SweeperError::Metadata {
            manifest: manifest.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(WorkspaceMetadata {
            workspace_root: Some(metadata.workspace_root.into_std_path_buf()),
            member_manifests: metadata
                .packages
                .into_iter()
                .map(|p| p.manifest_path.into_std_path_buf())
                .collect(),
        })
    }
}

/// In-memory metadata source keyed by manifest path.
///
/// Manifests that were never registered fail to query, like a broken
/// manifest would. Counts queries so callers can observe caching.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    entries: HashMap<PathBuf, WorkspaceMetadata>,
    queries: AtomicUsize,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a standalone package.
    pub fn standalone(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let manifest = dir.join(super::MANIFEST_NAME);
        self.entries.insert(
            manifest.clone(),
            WorkspaceMetadata {
                workspace_root: Some(dir.to_path_buf()),
                member_manifests: vec![manifest],
            },
        );
        self
    }

    /// Register a workspace root and its member directories.
    pub fn workspace<P: AsRef<Path>>(mut self, root: impl AsRef<Path>, members: &[P]) -> Self {
        let root = root.as_ref();
        let member_manifests: Vec<PathBuf> = members
            .iter()
            .map(|m| m.as_ref().join(super::MANIFEST_NAME))
            .collect();
        let metadata = WorkspaceMetadata {
            workspace_root: Some(root.to_path_buf()),
            member_manifests: member_manifests.clone(),
        };
        self.entries
            .insert(root.join(super::MANIFEST_NAME), metadata.clone());
        for manifest in member_manifests {
            self.entries.insert(manifest, metadata.clone());
        }
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl MetadataQuery for StaticMetadata {
    fn query(&self, manifest: &Path) -> Result<WorkspaceMetadata> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(manifest)
            .cloned()
            .ok_or_else(|| SweeperError::Metadata {
                manifest: manifest.to_path_buf(),
                message: "no metadata registered".to_string(),
            })
    }
}

/// Classification of a single manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Standalone(PathBuf),
    WorkspaceMember(PathBuf),
    WorkspaceRoot(PathBuf),
}

impl Classification {
    /// Directory that is the cleaning unit for this manifest.
    pub fn root(&self) -> &Path {
        match self {
            Classification::Standalone(root)
            | Classification::WorkspaceMember(root)
            | Classification::WorkspaceRoot(root) => root,
        }
    }

    pub fn is_workspace(&self) -> bool {
        !matches!(self, Classification::Standalone(_))
    }
}

/// Run-scoped cache of workspace metadata.
///
/// Keyed by workspace root; also indexes member manifests so a workspace is
/// queried once no matter how many of its members are discovered.
#[derive(Debug, Default)]
pub struct MetadataCache {
    workspaces: RwLock<HashMap<PathBuf, Arc<WorkspaceMetadata>>>,
    owners: RwLock<HashMap<PathBuf, PathBuf>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace root owning `manifest`, if a previous query covered it.
    pub fn owner_of(&self, manifest: &Path) -> Option<PathBuf> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        owners.get(manifest).cloned()
    }

    pub fn get(&self, root: &Path) -> Option<Arc<WorkspaceMetadata>> {
        let workspaces = self.workspaces.read().unwrap_or_else(|e| e.into_inner());
        workspaces.get(root).cloned()
    }

    /// Store metadata for `root` and claim its members.
    ///
    /// A member already claimed by a different root of the same depth is an
    /// unresolvable conflict. Otherwise the shallower root keeps the claim.
    pub fn insert(&self, root: &Path, metadata: WorkspaceMetadata) -> Result<()> {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        for manifest in &metadata.member_manifests {
            match owners.get(manifest) {
                Some(existing) if existing != root => {
                    let existing_depth = existing.components().count();
                    let depth = root.components().count();
                    if existing_depth == depth {
                        return Err(SweeperError::AmbiguousRoots {
                            first: existing.clone(),
                            second: root.to_path_buf(),
                        });
                    }
                    if depth < existing_depth {
                        owners.insert(manifest.clone(), root.to_path_buf());
                    }
                }
                Some(_) => {}
                None => {
                    owners.insert(manifest.clone(), root.to_path_buf());
                }
            }
        }
        drop(owners);

        let mut workspaces = self.workspaces.write().unwrap_or_else(|e| e.into_inner());
        workspaces.insert(root.to_path_buf(), Arc::new(metadata));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workspaces
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.workspaces
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.owners.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Classifies manifests as standalone, workspace root or workspace member.
pub struct WorkspaceClassifier<'a> {
    query: &'a dyn MetadataQuery,
    cache: &'a MetadataCache,
    warnings: RwLock<Vec<String>>,
}

impl<'a> WorkspaceClassifier<'a> {
    pub fn new(query: &'a dyn MetadataQuery, cache: &'a MetadataCache) -> Self {
        Self {
            query,
            cache,
            warnings: RwLock::new(Vec::new()),
        }
    }

    /// Classify a manifest.
    ///
    /// Query failures degrade to `Standalone` at the manifest's directory and
    /// are recorded as warnings. Only conflicting workspace claims are errors.
    pub fn classify(&self, manifest: &Path) -> Result<Classification> {
        let dir = manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let cached_root = self.cache.owner_of(manifest).or_else(|| {
            // Virtual manifest of an already-known workspace.
            self.cache.get(&dir).map(|_| dir.clone())
        });
        if let Some(root) = cached_root {
            if let Some(metadata) = self.cache.get(&root) {
                tracing::trace!(manifest = %manifest.display(), root = %root.display(), "Metadata cache hit");
                return Ok(Self::resolve(&dir, manifest, root, &metadata));
            }
        }

        let metadata = match self.query.query(manifest) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.warn(format!("{}; treating as standalone", e));
                return Ok(Classification::Standalone(dir));
            }
        };

        let Some(root) = metadata.workspace_root.clone() else {
            return Ok(Classification::Standalone(dir));
        };
        if !dir.starts_with(&root) {
            self.warn(format!(
                "Workspace root '{}' reported for '{}' is not an ancestor; treating as standalone",
                root.display(),
                manifest.display()
            ));
            return Ok(Classification::Standalone(dir));
        }

        let classification = Self::resolve(&dir, manifest, root.clone(), &metadata);
        self.cache.insert(&root, metadata)?;
        Ok(classification)
    }

    fn resolve(
        dir: &Path,
        manifest: &Path,
        root: PathBuf,
        metadata: &WorkspaceMetadata,
    ) -> Classification {
        if root != dir {
            return Classification::WorkspaceMember(root);
        }
        // A root whose only package is itself is an ordinary package.
        match metadata.member_manifests.as_slice() {
            [only] if only == manifest => Classification::Standalone(root),
            _ => Classification::WorkspaceRoot(root),
        }
    }

    fn warn(&self, message: String) {
        tracing::warn!("{}", message);
        self.warnings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> Vec<String> {
        self.warnings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
