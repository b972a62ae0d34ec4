//! Configuration management for ghtt.
//!
//! This crate handles loading, validating, and persisting configuration
//! from multiple sources (files, environment variables, defaults), and
//! storing the login token between runs.
//!
//! # Overview
//!
//! The crate is organized into the following modules:
//!
//! - [`config`]: Core configuration struct and loading logic
//! - [`auth`]: GitHub token resolution
//! - [`credentials`]: Local, encrypted storage of the login token
//! - [`persistence`]: Config and credential file reading and writing
//! - [`error`]: Error types for configuration operations
//!
//! # Configuration Sources (Priority)
//!
//! Configuration is loaded from multiple sources with the following priority
//! (highest to lowest):
//!
//! 1. Environment variables (`GHTT_API_URL`, `GHTT_ENVIRONMENT`,
//!    `GHTT_PER_PAGE`)
//! 2. Local config (`./ghtt.json5` or `./ghtt.json`)
//! 3. User config (`~/.config/ghtt/config.json5` or `~/.config/ghtt/config.json`)
//! 4. Built-in defaults
//!
//! ```json5
//! {
//!   api_base_url: "https://api.github.com",
//!   per_page: 30,
//!   // Keeps staging data apart from production on the same account
//!   gist: { description: "GHTT-state", filename: "GHTT-state", environment: "staging" },
//!   staleness_check: true,
//! }
//! ```
//!
//! # Token Resolution
//!
//! See [`auth::resolve_token`].
//!
//! # Examples
//!
//! ```no_run
//! use ghtt_config::Config;
//!
//! # async fn example() -> ghtt_config::Result<()> {
//! let config = Config::load().await?;
//! println!("State gist tag: {}", config.gist.tag());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod persistence;

// Re-export primary types at crate root for convenience
pub use auth::{ResolvedToken, TokenSource, resolve_token};
pub use config::{Config, GistConfig};
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, PassthroughCipher, TokenCipher,
};
pub use error::{ConfigError, Result};
