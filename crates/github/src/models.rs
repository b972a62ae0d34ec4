//! GitHub API payloads that are not part of the shared protocol.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ghtt_protocol::Account;
use serde::{Deserialize, Serialize};

/// A gist, as returned by `GET /gists` and `GET /gists/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    /// Gist identifier.
    pub id: String,
    /// Gist description. GitHub returns `null` for gists without one.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the gist is public.
    #[serde(default)]
    pub public: bool,
    /// Files keyed by filename.
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
}

/// A file within a gist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GistFile {
    /// File name.
    #[serde(default)]
    pub filename: Option<String>,
    /// URL serving the raw file content.
    #[serde(default)]
    pub raw_url: Option<String>,
    /// Inline content; only present on single-gist responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether the inline content was cut short.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

impl GistFile {
    /// Returns the inline content if it is complete.
    #[must_use]
    pub fn full_content(&self) -> Option<&str> {
        match self.truncated {
            Some(true) => None,
            _ => self.content.as_deref(),
        }
    }
}

/// Body of `POST /gists` and `PATCH /gists/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistPayload {
    /// Gist description.
    pub description: String,
    /// Whether the gist is public.
    pub public: bool,
    /// File contents keyed by filename.
    pub files: BTreeMap<String, FileContent>,
}

/// Content of one file in a [`GistPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// The full file content.
    pub content: String,
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier.
    pub id: u64,
    /// Markdown body.
    #[serde(default)]
    pub body: Option<String>,
    /// Comment author.
    #[serde(default)]
    pub user: Option<Account>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
