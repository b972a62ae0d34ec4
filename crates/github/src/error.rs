//! Error types for GitHub API operations.
//!
//! The variants follow the failure classes ghtt cares about:
//!
//! - transport and HTTP failures ([`Error::Api`], [`Error::Transport`],
//!   [`Error::Http`], [`Error::RateLimited`], [`Error::TokenValidation`]);
//! - resolution failures, when the expected gist or file does not exist
//!   ([`Error::GistNotFound`], [`Error::MissingFile`]);
//! - parse failures, when fetched content is not what was expected
//!   ([`Error::Decode`], [`Error::Document`]).
//!
//! The gist store heals resolution and parse failures by recreating the
//! document; transport failures are reported to the caller.

use std::time::Duration;

/// Errors that can occur during GitHub API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The octocrab client failed to send the request or read the response.
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// A non-octocrab transport failed to deliver the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("GitHub API returned HTTP {status} for {url}: {message}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The requested URL, without query string.
        url: String,
        /// The `message` field of the error body, or the raw body.
        message: String,
    },

    /// Token validation failed.
    ///
    /// This occurs when a provided token is invalid, expired, or lacks
    /// the necessary permissions.
    #[error("token validation failed: {reason}")]
    TokenValidation {
        /// A description of why validation failed.
        reason: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded{}", format_reset_time(*.reset_after))]
    RateLimited {
        /// Time until the rate limit resets, if known.
        reset_after: Option<Duration>,
    },

    /// No gist carries the expected description.
    #[error("no gist with description '{description}'")]
    GistNotFound {
        /// The description that was searched for.
        description: String,
    },

    /// The gist exists but has no readable file.
    #[error("gist {gist_id} has no file '{filename}'")]
    MissingFile {
        /// The gist that was searched.
        gist_id: String,
        /// The file that was expected.
        filename: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The requested URL.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The gist file does not hold a valid state document.
    #[error("invalid state document: {0}")]
    Document(#[from] ghtt_protocol::ProtocolError),

    /// A URL could not be built from the configured base and path.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An issue carries no repository, so its comments cannot be addressed.
    #[error("issue {issue_id} has no repository")]
    MissingRepository {
        /// The issue identifier.
        issue_id: u64,
    },

    /// A paginated listing stopped before reaching its last page.
    #[error("listing {resource} failed after {pages} page(s): {source}")]
    IncompleteListing {
        /// The listed resource (e.g. `gists`).
        resource: &'static str,
        /// How many pages were fetched successfully.
        pages: u32,
        /// The failure that interrupted the listing.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns whether this error means the expected gist or file does not
    /// exist.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::GistNotFound { .. } | Self::MissingFile { .. } | Self::Http { status: 404, .. }
        )
    }

    /// Returns whether this error means fetched content could not be parsed.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::Document(_))
    }
}

/// Formats the reset time for the rate limit error message.
fn format_reset_time(reset_after: Option<Duration>) -> String {
    match reset_after {
        Some(duration) => format!(", resets in {} seconds", duration.as_secs()),
        None => String::new(),
    }
}

/// A specialized Result type for GitHub API operations.
pub type Result<T> = std::result::Result<T, Error>;
