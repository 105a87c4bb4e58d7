//! External dependency tools: `cargo machete` and `cargo remove`.

use crate::deps::manifest::{DeclaredDependency, ManifestDependencies};
use crate::deps::scanner::{Detection, UsageDetector};
use crate::error::{Result, SweeperError};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

fn cargo_program() -> OsString {
    std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo"))
}

fn probe(program: &OsString, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Delegates detection to `cargo machete`.
#[derive(Debug, Clone)]
pub struct MacheteDetector {
    cargo: OsString,
}

impl MacheteDetector {
    pub fn new() -> Self {
        Self {
            cargo: cargo_program(),
        }
    }
}

impl Default for MacheteDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageDetector for MacheteDetector {
    fn name(&self) -> &'static str {
        "cargo-machete"
    }

    fn is_available(&self) -> bool {
        probe(&self.cargo, &["machete", "--version"])
    }

    fn detect(&self, manifest: &Path, deps: &ManifestDependencies) -> Result<Vec<Detection>> {
        let package_dir = manifest.parent().unwrap_or(Path::new("."));
        let output = Command::new(&self.cargo)
            .arg("machete")
            .arg(package_dir)
            .output()
            .map_err(|e| SweeperError::ExternalTool {
                tool: "cargo machete",
                path: manifest.to_path_buf(),
                message: e.to_string(),
            })?;

        // 0: nothing unused, 1: unused dependencies found.
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            return Err(SweeperError::ExternalTool {
                tool: "cargo machete",
                path: manifest.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let unused = unused_for_manifest(parse_machete_output(&stdout), manifest);

        Ok(deps
            .declared
            .iter()
            .map(|dep| Detection {
                used: !unused.contains(&dep.name),
                evidence: Vec::new(),
            })
            .collect())
    }
}

/// Parse `cargo machete` output into unused names per manifest.
///
/// Headers look like `name -- /path/Cargo.toml:` and are followed by one
/// indented dependency name per line.
pub fn parse_machete_output(output: &str) -> HashMap<PathBuf, HashSet<String>> {
    let mut result: HashMap<PathBuf, HashSet<String>> = HashMap::new();
    let mut current: Option<PathBuf> = None;

    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            let name = line.trim();
            if let (Some(manifest), false) = (&current, name.is_empty()) {
                result
                    .entry(manifest.clone())
                    .or_default()
                    .insert(name.to_string());
            }
            continue;
        }

        current = line
            .split_once(" -- ")
            .and_then(|(_, path)| path.trim().strip_suffix(':'))
            .map(PathBuf::from);
    }

    result
}

/// Unused names reported for `manifest`, comparing canonical paths.
///
/// Names listed under any other manifest are not this package's.
pub fn unused_for_manifest(
    by_manifest: HashMap<PathBuf, HashSet<String>>,
    manifest: &Path,
) -> HashSet<String> {
    let wanted = manifest
        .canonicalize()
        .unwrap_or_else(|_| manifest.to_path_buf());

    by_manifest
        .into_iter()
        .find(|(path, _)| path == manifest || path.canonicalize().is_ok_and(|p| p == wanted))
        .map(|(_, names)| names)
        .unwrap_or_default()
}

/// Removes dependencies through `cargo remove`.
#[derive(Debug, Clone)]
pub struct DependencyRemover {
    cargo: OsString,
}

impl DependencyRemover {
    pub fn new() -> Self {
        Self {
            cargo: cargo_program(),
        }
    }

    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            cargo: program.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        probe(&self.cargo, &["remove", "--help"])
    }

    /// Remove one dependency from `manifest`.
    pub fn remove(
        &self,
        manifest: &Path,
        dep: &DeclaredDependency,
    ) -> std::result::Result<(), String> {
        let mut cmd = Command::new(&self.cargo);
        cmd.arg("remove").arg(&dep.name);
        if let Some(flag) = dep.section.remove_flag() {
            cmd.arg(flag);
        }
        cmd.arg("--manifest-path").arg(manifest);

        let output = cmd
            .output()
            .map_err(|e| format!("failed to run cargo remove: {}", e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
        }
    }
}

impl Default for DependencyRemover {
    fn default() -> Self {
        Self::new()
    }
}
