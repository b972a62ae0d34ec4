//! The authenticated GitHub user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown when the user is not known yet.
pub const UNKNOWN_USER: &str = "???";

/// The profile returned by `GET /user` for the token's owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account login (e.g. `octocat`).
    pub login: String,
    /// Numeric account identifier.
    pub id: u64,
    /// Display name, when the user has set one.
    #[serde(default)]
    pub name: Option<String>,
    /// Remaining fields returned by GitHub.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Creates a profile with only a login and identifier.
    #[must_use]
    pub fn new(login: impl Into<String>, id: u64) -> Self {
        Self {
            login: login.into(),
            id,
            name: None,
            extra: Map::new(),
        }
    }

    /// Returns the display name, falling back to the login.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }
}
