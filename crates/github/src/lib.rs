//! GitHub API client for ghtt.
//!
//! This crate talks to GitHub on behalf of the time tracker: it lists the
//! issues assigned to the user, posts time entries as issue comments, and
//! keeps the tracker's state in a private gist.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - [`RateLimitMonitor`]: Process-wide view of GitHub's rate-limit headers
//! - [`GitHubClient`]: The API client, generic over its [`Transport`]
//! - [`PagePolicy`] and [`ListOutcome`]: Paginated listings that keep
//!   partial results when a page fails
//! - [`GistStore`]: Find-or-create, self-repairing storage of the
//!   [`GistDocument`](ghtt_protocol::GistDocument)
//! - [`Connector`]: Builds a client for a token at login
//! - [`Error`]: Error types for GitHub API operations
//!
//! # Authentication
//!
//! Tokens are handled using [`secrecy::SecretString`] and only exposed to
//! the transport. An unauthenticated client can still be built; the store
//! then returns an empty document without contacting GitHub.
//!
//! # Rate limits
//!
//! Every response is fed to the client's monitor. Clients built by the same
//! [`Connector`] call can share one monitor:
//!
//! ```no_run
//! use secrecy::SecretString;
//! use ghtt_github::{Connector, OctocrabConnector, RateLimitMonitor};
//!
//! # async fn example() -> ghtt_github::Result<()> {
//! let monitor = RateLimitMonitor::new();
//! let token = SecretString::from("ghp_your_token_here".to_string());
//! let client = OctocrabConnector::default().connect(&token, monitor.clone())?;
//!
//! client.get_user().await?;
//! if monitor.is_critical() {
//!     println!("more than half of a rate-limit quota is used");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! With the `test-util` feature, [`fake::FakeGitHub`] provides an in-memory
//! GitHub implementing both [`Transport`] and [`Connector`].

pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod models;
pub mod pagination;
pub mod ratelimit;
pub mod store;
pub mod transport;

// Re-export primary types at crate root for convenience
pub use client::{CACHE_BUST_PARAM, Connector, DEFAULT_API_BASE, GitHubClient, OctocrabConnector};
pub use error::{Error, Result};
pub use models::{Comment, FileContent, Gist, GistFile, GistPayload};
pub use pagination::{DEFAULT_PER_PAGE, ListOutcome, MAX_PER_PAGE, PagePolicy};
pub use ratelimit::{RateLimitMonitor, RateLimitRecord, RateLimitSnapshot};
pub use store::{DEFAULT_DESCRIPTION, DEFAULT_FILENAME, GistStore, ReadAction, ReadOutcome};
pub use transport::{ApiRequest, ApiResponse, Method, OctocrabTransport, ResponseHeaders, Transport};
