//! Error types for session operations.

use thiserror::Error;

/// Errors that can occur while driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a logged-in session.
    #[error("not logged in")]
    NotLoggedIn,

    /// A GitHub call failed.
    #[error(transparent)]
    Github(#[from] ghtt_github::Error),

    /// The credential store failed.
    #[error("credential store error: {0}")]
    Credentials(#[from] ghtt_config::ConfigError),

    /// The session task has stopped.
    #[error("session task is no longer running")]
    ActorClosed,
}

/// A specialized Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
