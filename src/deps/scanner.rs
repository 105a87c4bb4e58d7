//! Static usage scan of declared dependencies.

use crate::deps::manifest::{DeclaredDependency, DependencySection, ManifestDependencies};
use crate::discovery::{ProjectRoot, ARTIFACT_DIR_NAME, MANIFEST_NAME};
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source directories scanned relative to a package directory.
const SOURCE_DIRS: &[&str] = &["src", "examples", "tests", "benches"];

/// Build script scanned in addition to the source directories.
const BUILD_SCRIPT: &str = "build.rs";

/// Evidence locations kept per dependency.
const MAX_EVIDENCE: usize = 3;

/// Where a dependency was found to be referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub file: PathBuf,
    /// 1-based line; absent for manifest-level evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// Usage verdict for one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Detection {
    pub used: bool,
    pub evidence: Vec<Evidence>,
}

/// What happened when removal of an unused dependency was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RemovalStatus {
    Removed,
    WouldRemove,
    Failed { error: String },
}

/// Per-dependency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyUsage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub section: DependencySection,
    pub used: bool,
    /// Never reported as unused (macro support crates, configured ignores).
    pub ignored: bool,
    pub evidence: Vec<Evidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<RemovalStatus>,
}

/// Dependency usage of one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub dependencies: Vec<DependencyUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyReport {
    pub fn unused(&self) -> impl Iterator<Item = &DependencyUsage> {
        self.dependencies.iter().filter(|d| !d.used)
    }
}

/// Decides which declared dependencies are used.
pub trait UsageDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the detector can run at all on this machine.
    fn is_available(&self) -> bool {
        true
    }

    /// One detection per entry of `deps.declared`, in the same order.
    fn detect(&self, manifest: &Path, deps: &ManifestDependencies) -> Result<Vec<Detection>>;
}

/// Text scan of the package's Rust sources.
///
/// Matches path syntax (`name::`), `use`/`extern crate` items, macro calls
/// (`name!`) and attributes (`#[name`). A hit in any scanned file marks the
/// dependency used.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDetector;

impl UsageDetector for NativeDetector {
    fn name(&self) -> &'static str {
        "native"
    }

    fn detect(&self, manifest: &Path, deps: &ManifestDependencies) -> Result<Vec<Detection>> {
        let package_dir = manifest.parent().unwrap_or(Path::new("."));
        let idents: Vec<String> = deps.declared.iter().map(DeclaredDependency::ident).collect();
        let mut detections = vec![Detection::default(); idents.len()];

        for file in source_files(package_dir) {
            let content = match fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(file = %file.display(), error = %e, "Skipping unreadable source");
                    continue;
                }
            };

            for (ident, detection) in idents.iter().zip(detections.iter_mut()) {
                if detection.evidence.len() >= MAX_EVIDENCE {
                    continue;
                }
                if let Some(line) = find_reference(&content, ident) {
                    detection.used = true;
                    detection.evidence.push(Evidence {
                        file: file.clone(),
                        line: Some(line),
                    });
                }
            }
        }

        Ok(detections)
    }
}

/// Rust files a package's dependencies can be used from.
pub fn source_files(package_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for dir in SOURCE_DIRS {
        let dir = package_dir.join(dir);
        if !dir.is_dir() {
            continue;
        }
        let walker = WalkDir::new(&dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || name == ARTIFACT_DIR_NAME)
            });
        files.extend(
            walker
                .flatten()
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
                .map(|e| e.into_path()),
        );
    }

    let build_script = package_dir.join(BUILD_SCRIPT);
    if build_script.is_file() {
        files.push(build_script);
    }

    files
}

/// First line (1-based) that references `ident` as a crate.
pub fn find_reference(content: &str, ident: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line_references(line, ident))
        .map(|i| i + 1)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn line_references(line: &str, ident: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") {
        return false;
    }

    for (idx, _) in line.match_indices(ident) {
        let before = &line[..idx];
        if before.chars().next_back().is_some_and(is_ident_char) {
            continue;
        }
        // `other::ident::` is a module path, not this crate.
        if let Some(head) = before.strip_suffix("::") {
            if head
                .chars()
                .next_back()
                .is_some_and(|c| is_ident_char(c) || c == '>')
            {
                continue;
            }
        }

        let rest = &line[idx + ident.len()..];
        if rest.starts_with("::") || rest.starts_with('!') {
            return true;
        }
        if rest.chars().next().is_some_and(is_ident_char) {
            continue;
        }

        let prefix = before.trim_end();
        if prefix.ends_with("use") || prefix.ends_with("extern crate") || prefix.ends_with("#[")
        {
            return true;
        }
    }

    false
}

/// Scans project roots for unused dependencies.
pub struct DependencyScanner {
    detector: Box<dyn UsageDetector>,
    ignore: HashSet<String>,
    feature_usage: bool,
}

impl DependencyScanner {
    pub fn new(detector: Box<dyn UsageDetector>) -> Self {
        Self {
            detector,
            ignore: HashSet::new(),
            feature_usage: true,
        }
    }

    pub fn with_ignore<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_feature_usage(mut self, enabled: bool) -> Self {
        self.feature_usage = enabled;
        self
    }

    pub fn detector(&self) -> &dyn UsageDetector {
        self.detector.as_ref()
    }

    /// Scan every package manifest of a root.
    pub fn scan(&self, root: &ProjectRoot) -> Vec<DependencyReport> {
        let manifests = if root.manifests.is_empty() {
            vec![root.path.join(MANIFEST_NAME)]
        } else {
            root.manifests.clone()
        };

        manifests
            .iter()
            .filter_map(|manifest| self.scan_manifest(&root.path, manifest))
            .collect()
    }

    /// Scan one manifest. Returns `None` for manifests without a package.
    pub fn scan_manifest(&self, root: &Path, manifest: &Path) -> Option<DependencyReport> {
        let report = |dependencies, error| DependencyReport {
            root: root.to_path_buf(),
            manifest: manifest.to_path_buf(),
            dependencies,
            error,
        };

        let deps = match ManifestDependencies::load(manifest) {
            Ok(deps) => deps,
            Err(e) => {
                tracing::warn!("Skipping dependency scan: {}", e);
                return Some(report(Vec::new(), Some(e.to_string())));
            }
        };
        if !deps.has_package {
            return None;
        }

        let detections = match self.detector.detect(manifest, &deps) {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!("Dependency detection failed: {}", e);
                return Some(report(Vec::new(), Some(e.to_string())));
            }
        };

        let usages = deps
            .declared
            .iter()
            .zip(detections)
            .map(|(dep, detection)| self.usage(manifest, &deps, dep, detection))
            .collect();

        Some(report(usages, None))
    }

    fn usage(
        &self,
        manifest: &Path,
        deps: &ManifestDependencies,
        dep: &DeclaredDependency,
        detection: Detection,
    ) -> DependencyUsage {
        let ignored = self.is_ignored(dep);
        let mut used = detection.used || ignored;
        let mut evidence = detection.evidence;

        if !used && self.feature_usage && deps.feature_refs.contains(&dep.name) {
            used = true;
            evidence.push(Evidence {
                file: manifest.to_path_buf(),
                line: None,
            });
        }

        DependencyUsage {
            name: dep.name.clone(),
            package: dep.package.clone(),
            section: dep.section,
            used,
            ignored,
            evidence,
            removal: None,
        }
    }

    fn is_ignored(&self, dep: &DeclaredDependency) -> bool {
        let names = std::iter::once(dep.name.as_str()).chain(dep.package.as_deref());
        names.into_iter().any(|name| {
            self.ignore.contains(name)
                || name.ends_with("_derive")
                || name.ends_with("-derive")
                || name.contains("proc-macro")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ProjectKind;
    use tempfile::TempDir;

    fn write_package(dir: &Path, manifest: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_NAME), manifest).unwrap();
        for (rel, content) in files {
            let path = dir.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    fn scanner() -> DependencyScanner {
        DependencyScanner::new(Box::new(NativeDetector))
    }

    #[test]
    fn test_used_and_unused() {
        let tmp = TempDir::new().unwrap();
        write_package(
            tmp.path(),
            "[package]\nname = \"p\"\n\n[dependencies]\nfoo = \"1\"\nbar = \"1\"\n",
            &[("src/main.rs", "use foo::Thing;\nfn main() {}\n")],
        );
        let root = ProjectRoot::new(tmp.path(), ProjectKind::Standalone);

        let reports = scanner().scan(&root);

        assert_eq!(reports.len(), 1);
        let deps = &reports[0].dependencies;
        assert_eq!(deps[0].name, "foo");
        assert!(deps[0].used);
        assert_eq!(deps[0].evidence[0].line, Some(1));
        assert_eq!(deps[1].name, "bar");
        assert!(!deps[1].used);
        assert!(deps[1].evidence.is_empty());
        assert_eq!(reports[0].unused().count(), 1);
    }

    #[test]
    fn test_usage_in_tests_examples_and_build_script() {
        let tmp = TempDir::new().unwrap();
        write_package(
            tmp.path(),
            "[package]\nname = \"p\"\n\n[dependencies]\nin-example = \"1\"\n\n[dev-dependencies]\nin_test = \"1\"\n\n[build-dependencies]\ncc = \"1\"\n",
            &[
                ("src/lib.rs", "pub fn f() {}\n"),
                ("examples/demo.rs", "fn main() { in_example::run(); }\n"),
                ("tests/it.rs", "#[in_test::case]\nfn t() {}\n"),
                ("build.rs", "fn main() { cc::Build::new(); }\n"),
            ],
        );
        let root = ProjectRoot::new(tmp.path(), ProjectKind::Standalone);

        let reports = scanner().scan(&root);

        assert!(reports[0].dependencies.iter().all(|d| d.used));
    }

    #[test]
    fn test_macro_invocation_counts() {
        assert_eq!(find_reference("let x = anyhow!(\"boom\");", "anyhow"), Some(1));
        assert_eq!(find_reference("\n\nlazy_static! {", "lazy_static"), Some(3));
    }

    #[test]
    fn test_reference_boundaries() {
        assert!(line_references("use log;", "log"));
        assert!(line_references("pub use rand as r;", "rand"));
        assert!(line_references("extern crate libc;", "libc"));
        assert!(line_references("#[tokio::main]", "tokio"));
        assert!(line_references("let v = ::regex::Regex::new(x);", "regex"));
        assert!(!line_references("let catalog::x = 1;", "log"));
        assert!(!line_references("tracing::log::info!(\"x\");", "log"));
        assert!(!line_references("// use foo::bar;", "foo"));
        assert!(!line_references("let foobar = 1;", "foo"));
        assert!(!line_references("use foo_bar::x;", "foo"));
    }

    #[test]
    fn test_ignored_and_feature_wired_dependencies() {
        let tmp = TempDir::new().unwrap();
        write_package(
            tmp.path(),
            r#"[package]
name = "p"

[dependencies]
serde = "1"
my-derive = "1"
wired = { version = "1", optional = true }
idle = "1"

[features]
extra = ["dep:wired"]
"#,
            &[("src/lib.rs", "pub fn f() {}\n")],
        );
        let root = ProjectRoot::new(tmp.path(), ProjectKind::Standalone);

        let reports = scanner().with_ignore(["serde"]).scan(&root);
        let deps = &reports[0].dependencies;

        assert!(deps[0].used && deps[0].ignored);
        assert!(deps[1].used && deps[1].ignored);
        assert!(deps[2].used && !deps[2].ignored);
        assert!(!deps[3].used);

        let reports = scanner().with_feature_usage(false).scan(&root);
        assert!(!reports[0].dependencies[2].used);
    }

    #[test]
    fn test_renamed_dependency_uses_alias() {
        let tmp = TempDir::new().unwrap();
        write_package(
            tmp.path(),
            "[package]\nname = \"p\"\n\n[dependencies]\njson = { package = \"serde_json\", version = \"1\" }\n",
            &[("src/lib.rs", "pub fn f() { json::json!({}); }\n")],
        );
        let root = ProjectRoot::new(tmp.path(), ProjectKind::Standalone);

        let reports = scanner().scan(&root);
        let dep = &reports[0].dependencies[0];

        assert_eq!(dep.package.as_deref(), Some("serde_json"));
        assert!(dep.used);
        assert!(!dep.ignored);
    }

    #[test]
    fn test_malformed_manifest_reported_per_root() {
        let tmp = TempDir::new().unwrap();
        write_package(tmp.path(), "[package\n", &[]);
        let root = ProjectRoot::new(tmp.path(), ProjectKind::Standalone);

        let reports = scanner().scan(&root);

        assert_eq!(reports.len(), 1);
        assert!(reports[0].error.is_some());
        assert!(reports[0].dependencies.is_empty());
    }

    #[test]
    fn test_virtual_manifest_skipped() {
        let tmp = TempDir::new().unwrap();
        write_package(tmp.path(), "[workspace]\nmembers = [\"a\"]\n", &[]);
        write_package(
            &tmp.path().join("a"),
            "[package]\nname = \"a\"\n\n[dependencies]\nfoo = \"1\"\n",
            &[("src/lib.rs", "")],
        );
        let mut root = ProjectRoot::new(tmp.path(), ProjectKind::Workspace);
        root.manifests = vec![
            tmp.path().join(MANIFEST_NAME),
            tmp.path().join("a").join(MANIFEST_NAME),
        ];

        let reports = scanner().scan(&root);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].manifest, tmp.path().join("a").join(MANIFEST_NAME));
        assert!(!reports[0].dependencies[0].used);
    }

    #[test]
    fn test_source_files_skip_hidden_and_target() {
        let tmp = TempDir::new().unwrap();
        write_package(
            tmp.path(),
            "[package]\nname = \"p\"\n",
            &[
                ("src/lib.rs", ""),
                ("src/nested/mod.rs", ""),
                ("src/.hidden/x.rs", ""),
                ("tests/target/gen.rs", ""),
                ("src/notes.txt", ""),
            ],
        );

        let files = source_files(tmp.path());
        let rel: Vec<PathBuf> = files
            .iter()
            .map(|f| f.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![PathBuf::from("src/lib.rs"), PathBuf::from("src/nested/mod.rs")]
        );
    }
}
