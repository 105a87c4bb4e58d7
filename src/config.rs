use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound accepted for `cleaner.jobs`.
const MAX_JOBS: usize = 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cleaner: CleanerConfig,
    pub deps: DepsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Glob patterns to exclude, matched against paths relative to the scan root
    pub exclude_patterns: Vec<String>,
    /// Descend into hidden directories
    pub include_hidden: bool,
    /// Follow symbolic links while discovering manifests
    pub follow_symlinks: bool,
    /// Maximum scan depth (unset = unlimited)
    pub max_depth: Option<usize>,
    /// Parallel clean jobs (0 = available parallelism)
    pub jobs: usize,
    /// Try `cargo clean` before deleting the artifact directory directly
    pub use_native_clean: bool,
    /// Only clean projects whose artifacts are at least this large
    pub min_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Detection backend: native, cargo-machete
    pub backend: String,
    /// Dependency names never reported as unused
    pub ignore: Vec<String>,
    /// Treat references from `[features]` as usage
    pub scan_manifest_features: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec![],
            include_hidden: false,
            follow_symlinks: false,
            max_depth: None,
            jobs: 0,
            use_native_clean: true,
            min_size: None,
        }
    }
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            backend: "native".to_string(),
            ignore: [
                "proc-macro2",
                "quote",
                "syn",
                "serde",
                "serde_derive",
                "serde_json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            scan_manifest_features: true,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the per-user config file
    /// (`<config dir>/cargo-sweeper/config.toml`) is used when present,
    /// otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.clone(),
                source,
            })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cargo-sweeper").join("config.toml"))
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.cleaner.jobs > MAX_JOBS {
            return Err(ConfigError::Invalid(format!(
                "cleaner.jobs must be at most {}, got {}",
                MAX_JOBS, self.cleaner.jobs
            )));
        }
        match self.deps.backend.as_str() {
            "native" | "cargo-machete" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown deps.backend '{}' (expected native or cargo-machete)",
                    other
                )))
            }
        }
        if let Some(size) = &self.cleaner.min_size {
            if crate::size::parse_size(size).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "cleaner.min_size '{}' is not a valid size",
                    size
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.cleaner.use_native_clean);
        assert_eq!(config.deps.backend, "native");
    }

    #[test]
    fn config_serializes_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[cleaner]"));
        assert!(toml_str.contains("[deps]"));
    }

    #[test]
    fn default_ignore_list_covers_macro_support_crates() {
        let config = DepsConfig::default();
        assert!(config.ignore.contains(&"syn".to_string()));
        assert!(config.ignore.contains(&"quote".to_string()));
    }

    #[test]
    fn too_many_jobs_rejected() {
        let mut config = Config::default();
        config.cleaner.jobs = 5000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = Config::default();
        config.deps.backend = "udeps".into();
        assert!(config.validate().is_err());
    }
}
