//! Clean strategies tried in sequence.

use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// The first strategy in the chain.
    Primary,
    /// Any later strategy.
    Fallback,
    /// Nothing was run (dry run or nothing to clean).
    None,
}

/// Outcome of running one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Done { detail: String },
    Failed { detail: String },
}

/// A way of removing a project's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanStrategy {
    /// `cargo clean --target-dir <artifact dir>` from the project root.
    ///
    /// The explicit target dir keeps `CARGO_TARGET_DIR` and
    /// `build.target-dir` from redirecting the clean elsewhere.
    CargoClean { program: OsString },
    /// Run an arbitrary command from the project root.
    NativeCommand { program: OsString, args: Vec<String> },
    /// Recursively delete the artifact directory.
    RemoveDir,
}

impl CleanStrategy {
    /// `cargo clean`, using the cargo that invoked us when available.
    pub fn cargo_clean() -> Self {
        CleanStrategy::CargoClean {
            program: std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo")),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CleanStrategy::CargoClean { .. } => "cargo clean".to_string(),
            CleanStrategy::NativeCommand { program, args } => {
                let program = Path::new(program)
                    .file_name()
                    .unwrap_or(program.as_os_str())
                    .to_string_lossy()
                    .into_owned();
                std::iter::once(program)
                    .chain(args.iter().cloned())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            CleanStrategy::RemoveDir => "remove directory".to_string(),
        }
    }

    pub fn run(&self, root: &Path, artifact_dir: &Path) -> StrategyOutcome {
        match self {
            CleanStrategy::CargoClean { program } => {
                let args = [
                    OsString::from("clean"),
                    OsString::from("--target-dir"),
                    artifact_dir.as_os_str().to_os_string(),
                ];
                run_command(program, &args, root)
            }
            CleanStrategy::NativeCommand { program, args } => {
                run_command(program, args, root)
            }
            CleanStrategy::RemoveDir => remove_dir(artifact_dir),
        }
    }
}

fn run_command<S: AsRef<OsStr>>(
    program: &OsString,
    args: &[S],
    root: &Path,
) -> StrategyOutcome {
    let output = match Command::new(program).args(args).current_dir(root).output() {
        Ok(output) => output,
        Err(e) => {
            return StrategyOutcome::Failed {
                detail: format!("failed to run {}: {}", program.to_string_lossy(), e),
            }
        }
    };

    if output.status.success() {
        StrategyOutcome::Done {
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        StrategyOutcome::Failed {
            detail: format!("command exited with {}: {}", output.status, stderr.trim()),
        }
    }
}

fn remove_dir(artifact_dir: &Path) -> StrategyOutcome {
    let meta = match fs::symlink_metadata(artifact_dir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StrategyOutcome::Done {
                detail: "already absent".to_string(),
            }
        }
        Err(e) => {
            return StrategyOutcome::Failed {
                detail: format!("{}: {}", artifact_dir.display(), e),
            }
        }
    };

    if !meta.is_dir() {
        return StrategyOutcome::Failed {
            detail: format!("{} is not a directory", artifact_dir.display()),
        };
    }

    match fs::remove_dir_all(artifact_dir) {
        Ok(()) => StrategyOutcome::Done {
            detail: format!("removed {}", artifact_dir.display()),
        },
        Err(e) => StrategyOutcome::Failed {
            detail: format!("{}: {}", artifact_dir.display(), e),
        },
    }
}
