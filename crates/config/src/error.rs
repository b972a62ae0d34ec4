//! Error types for configuration operations.
//!
//! This module defines the error types that can occur during configuration
//! loading, parsing, and validation, and while reading or writing the local
//! credential store.

use std::path::PathBuf;

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file at {path}: {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a configuration file.
    #[error("failed to write config file at {path}: {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON5 configuration.
    #[error("failed to parse config: {0}")]
    ParseJson5(#[from] serde_json5::Error),

    /// Failed to serialize configuration to JSON.
    #[error("failed to serialize config: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidApiUrl {
        /// The configured URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The page size is outside `1..=100`.
    #[error("invalid page size {value}: must be between 1 and 100")]
    InvalidPerPage {
        /// The configured page size.
        value: i64,
    },

    /// An environment variable holds a value of the wrong shape.
    #[error("invalid value '{value}' for environment variable {name}")]
    InvalidEnvVar {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The credential file exists but is not a JSON object of strings.
    #[error("credential file at {path} is corrupt: {source}")]
    CorruptCredentials {
        /// The credential file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The stored credential could not be encrypted or decrypted.
    #[error("credential cipher failed: {reason}")]
    Cipher {
        /// A description of the failure.
        reason: String,
    },

    /// Failed to determine home directory.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// Failed to execute `gh auth token` command.
    #[error("failed to get GitHub token from gh CLI: {0}")]
    GhAuthFailed(#[source] std::io::Error),

    /// The `gh auth token` command returned an error.
    #[error("gh auth token failed with exit code {code:?}: {stderr}")]
    GhAuthError {
        /// The exit code, if available.
        code: Option<i32>,
        /// The stderr output.
        stderr: String,
    },
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_per_page() {
        let err = ConfigError::InvalidPerPage { value: 250 };
        assert_eq!(
            err.to_string(),
            "invalid page size 250: must be between 1 and 100"
        );
    }

    #[test]
    fn error_display_invalid_env_var() {
        let err = ConfigError::InvalidEnvVar {
            name: "GHTT_PER_PAGE",
            value: "lots".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value 'lots' for environment variable GHTT_PER_PAGE"
        );
    }
}
