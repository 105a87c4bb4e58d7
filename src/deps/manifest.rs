//! Declared dependencies of a manifest.

use crate::error::{Result, SweeperError};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Manifest section a dependency is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
    BuildDependencies,
}

impl DependencySection {
    pub const ALL: [DependencySection; 3] = [
        DependencySection::Dependencies,
        DependencySection::DevDependencies,
        DependencySection::BuildDependencies,
    ];

    /// Table name in the manifest.
    pub fn key(self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "dev-dependencies",
            DependencySection::BuildDependencies => "build-dependencies",
        }
    }

    /// Flag selecting this section for `cargo remove`.
    pub fn remove_flag(self) -> Option<&'static str> {
        match self {
            DependencySection::Dependencies => None,
            DependencySection::DevDependencies => Some("--dev"),
            DependencySection::BuildDependencies => Some("--build"),
        }
    }
}

impl std::fmt::Display for DependencySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.key())
    }
}

/// One entry of a dependency table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    /// Key in the manifest; also the name used in source code.
    pub name: String,
    /// Real package name when the key is a rename.
    pub package: Option<String>,
    pub section: DependencySection,
}

impl DeclaredDependency {
    /// Identifier the crate is referenced by in Rust source.
    pub fn ident(&self) -> String {
        self.name.replace('-', "_")
    }
}

/// Parsed view of a manifest's dependency information.
#[derive(Debug, Clone, Default)]
pub struct ManifestDependencies {
    /// Whether the manifest declares a `[package]`.
    pub has_package: bool,
    /// Declared dependencies in declaration order, section by section.
    pub declared: Vec<DeclaredDependency>,
    /// Dependency names wired through `[features]`.
    pub feature_refs: HashSet<String>,
}

impl ManifestDependencies {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SweeperError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| SweeperError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let doc: toml::Table = toml::from_str(content)?;

        let mut declared = Vec::new();
        for section in DependencySection::ALL {
            let Some(table) = doc.get(section.key()).and_then(|v| v.as_table()) else {
                continue;
            };
            for (name, spec) in table {
                let package = spec
                    .as_table()
                    .and_then(|t| t.get("package"))
                    .and_then(|p| p.as_str())
                    .map(str::to_string);
                declared.push(DeclaredDependency {
                    name: name.clone(),
                    package,
                    section,
                });
            }
        }

        let mut feature_refs = HashSet::new();
        if let Some(features) = doc.get("features").and_then(|v| v.as_table()) {
            for value in features.values().filter_map(|v| v.as_array()) {
                for item in value.iter().filter_map(|v| v.as_str()) {
                    if let Some(name) = feature_dependency(item) {
                        feature_refs.insert(name.to_string());
                    }
                }
            }
        }

        Ok(Self {
            has_package: doc.contains_key("package"),
            declared,
            feature_refs,
        })
    }
}

/// Dependency named by a feature value (`dep:x`, `x/feat`, `x?/feat`).
fn feature_dependency(item: &str) -> Option<&str> {
    if let Some(name) = item.strip_prefix("dep:") {
        return Some(name);
    }
    let (name, _) = item.split_once('/')?;
    Some(name.trim_end_matches('?'))
}
