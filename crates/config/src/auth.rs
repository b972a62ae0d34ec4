//! GitHub token resolution.
//!
//! The token ghtt logs in with is taken from the first source that has one:
//!
//! 1. The `--token` command-line flag
//! 2. The local credential store (the token saved at the last login)
//! 3. `github_token` from config, or the `GITHUB_TOKEN` environment variable
//! 4. `gh auth token` command (GitHub CLI)
//!
//! Without any of these ghtt stays logged out.

use std::fmt;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Given on the command line.
    Explicit,
    /// Loaded from the credential store.
    Stored,
    /// Set in the configuration file or `GITHUB_TOKEN`.
    Config,
    /// Obtained from `gh auth token`.
    GhCli,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "command line",
            Self::Stored => "credential store",
            Self::Config => "configuration",
            Self::GhCli => "gh CLI",
        })
    }
}

/// A token and its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    /// The token value.
    pub token: String,
    /// Where it came from.
    pub source: TokenSource,
}

impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the token to log in with, skipping empty values.
///
/// The `gh` CLI is only consulted when no other source has a token.
///
/// # Examples
///
/// ```no_run
/// use ghtt_config::{Config, auth::{TokenSource, resolve_token}};
///
/// # async fn example() {
/// let config = Config::default();
/// let resolved = resolve_token(Some("ghp_flag"), None, &config).await;
/// assert_eq!(resolved.unwrap().source, TokenSource::Explicit);
/// # }
/// ```
pub async fn resolve_token(
    explicit: Option<&str>,
    stored: Option<&str>,
    config: &Config,
) -> Option<ResolvedToken> {
    let candidates = [
        (explicit, TokenSource::Explicit),
        (stored, TokenSource::Stored),
        (config.github_token.as_deref(), TokenSource::Config),
    ];
    let found = candidates.into_iter().find_map(|(token, source)| {
        let token = token.map(str::trim).filter(|token| !token.is_empty())?;
        Some(ResolvedToken {
            token: token.to_string(),
            source,
        })
    });
    if found.is_some() {
        return found;
    }

    get_gh_token().await.ok().flatten().map(|token| ResolvedToken {
        token,
        source: TokenSource::GhCli,
    })
}

/// Gets a GitHub token from the `gh` CLI.
///
/// Runs `gh auth token` and returns the token if successful.
///
/// # Returns
///
/// - `Ok(Some(token))` if the command succeeds and returns a token
/// - `Ok(None)` if `gh` is not installed or not logged in
/// - `Err(...)` if the command exists but fails
///
/// # Errors
///
/// Returns an error if the `gh` command exists but cannot be run or exits
/// with an unexpected error.
pub async fn get_gh_token() -> Result<Option<String>> {
    use tokio::process::Command;

    let output = match Command::new("gh").args(["auth", "token"]).output().await {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::GhAuthFailed(e)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("not logged in") || stderr.contains("no oauth token") {
            return Ok(None);
        }
        return Err(ConfigError::GhAuthError {
            code: output.status.code(),
            stderr,
        });
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}
