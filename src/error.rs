use std::path::PathBuf;
use thiserror::Error;

/// Core library errors
#[derive(Error, Debug)]
pub enum SweeperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error at path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Metadata query failed for '{manifest}': {message}")]
    Metadata { manifest: PathBuf, message: String },

    #[error("{tool} failed for '{path}': {message}")]
    ExternalTool {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("Failed to parse manifest '{path}': {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "Ambiguous project roots '{first}' and '{second}' claim the same projects at equal depth"
    )]
    AmbiguousRoots { first: PathBuf, second: PathBuf },

    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid size '{0}' (expected e.g. 100MB, 1.5GiB)")]
    InvalidSize(String),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SweeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = ConfigError::Invalid("jobs must be at most 1024".into());
        assert!(err.to_string().contains("jobs"));

        let err = SweeperError::AmbiguousRoots {
            first: PathBuf::from("/a/x"),
            second: PathBuf::from("/a/y"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a/x"));
        assert!(msg.contains("/a/y"));
    }

    #[test]
    fn error_conversion() {
        let config_err = ConfigError::Invalid("test".into());
        let sweeper_err: SweeperError = config_err.into();
        assert!(matches!(sweeper_err, SweeperError::Config(_)));
    }
}
