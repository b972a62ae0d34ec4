//! Error types for the ghtt-protocol crate.
//!
//! This module defines the errors that can occur when working with protocol
//! types, such as decoding the persisted state document or parsing an issue
//! reference typed by a user.

use thiserror::Error;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize a protocol type to JSON.
    #[error("failed to serialize to JSON: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// Failed to deserialize a protocol type from JSON.
    #[error("failed to deserialize from JSON: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    /// An issue reference did not match the `owner/repo#number` format.
    #[error("invalid issue reference '{input}': {reason}")]
    InvalidIssueRef {
        /// The text that failed to parse.
        input: String,
        /// Why the text was rejected.
        reason: &'static str,
    },
}

/// A specialized Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
