//! Session state.
//!
//! A [`Session`] is everything ghtt knows while running: the token, the
//! user it belongs to, and the state document loaded from the gist. It is
//! replaced wholesale on login and logout and mutated in place by the
//! [`SessionController`](crate::SessionController).

use std::fmt;

use chrono::{DateTime, Utc};
use ghtt_config::ConfigError;
use ghtt_github::Error as GithubError;
use ghtt_protocol::{GistDocument, IssueId, TimeEntry, UNKNOWN_USER, UserProfile};
use secrecy::{ExposeSecret, SecretString};

/// Where the login state machine stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginState {
    /// No user is logged in.
    #[default]
    LoggedOut,
    /// A login is resolving the user and loading the document.
    LoggingIn,
    /// A user is logged in and the document is loaded.
    LoggedIn,
}

/// How the active timer relates to a given issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueTimerState {
    /// No timer is running.
    #[default]
    Idle,
    /// The timer runs on this issue.
    Running,
    /// The timer runs on another issue.
    OtherIssue,
}

/// The live session.
#[derive(Default)]
pub struct Session {
    /// Token the session logged in with.
    pub token: Option<SecretString>,
    /// The logged-in user.
    pub user: Option<UserProfile>,
    /// The state document: tracked issues and the active timer.
    pub document: GistDocument,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            token: self.token.as_ref().map(clone_secret),
            user: self.user.clone(),
            document: self.document.clone(),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user.as_ref().map(|user| &user.login))
            .field("document", &self.document)
            .finish()
    }
}

impl Session {
    /// Returns the login of the session's user, or a placeholder.
    #[must_use]
    pub fn login(&self) -> &str {
        self.user.as_ref().map_or(UNKNOWN_USER, |user| user.login.as_str())
    }

    /// Returns the identifier of the gist holding the document, if known.
    #[must_use]
    pub fn gist_id(&self) -> Option<&str> {
        self.document
            .has_id()
            .then_some(self.document.id.as_str())
    }

    /// Returns when the active timer started, if one runs.
    #[must_use]
    pub fn timer_started_at(&self) -> Option<DateTime<Utc>> {
        self.document.start.as_ref().map(|timer| timer.at)
    }

    /// Returns how the active timer relates to an issue.
    #[must_use]
    pub fn issue_timer_state(&self, issue: IssueId) -> IssueTimerState {
        match self.document.active_issue_id() {
            None => IssueTimerState::Idle,
            Some(active) if active == issue => IssueTimerState::Running,
            Some(_) => IssueTimerState::OtherIssue,
        }
    }
}

pub(crate) fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

pub(crate) fn same_token(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    a.map(|s| s.expose_secret()) == b.map(|s| s.expose_secret())
}

/// Which persistence step a [`Failure`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Saving or clearing the local credential.
    Credentials,
    /// Writing the state document to the gist.
    Document,
    /// Repairing the document while loading it.
    Repair,
    /// Posting a time entry comment.
    Comment,
}

/// A failure that was logged and swallowed instead of failing the
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Where it happened.
    pub kind: FailureKind,
    /// The error message.
    pub message: String,
}

impl Failure {
    pub(crate) fn github(kind: FailureKind, error: &GithubError) -> Self {
        Self {
            kind,
            message: error.to_string(),
        }
    }

    pub(crate) fn credentials(error: &ConfigError) -> Self {
        Self {
            kind: FailureKind::Credentials,
            message: error.to_string(),
        }
    }
}

/// What an operation persisted, and what failed along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// The token changed and was saved to (or cleared from) the credential
    /// store.
    pub token_persisted: bool,
    /// The document changed and was written to the gist.
    pub document_written: bool,
    /// The gist had been changed elsewhere since it was last synced; it was
    /// overwritten anyway.
    pub remote_changed: bool,
    /// The time entry the operation recorded, if any.
    pub entry: Option<TimeEntry>,
    /// Failures that did not abort the operation.
    pub failures: Vec<Failure>,
}

impl CommitReport {
    /// Returns whether nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns whether a failure of the given kind was recorded.
    #[must_use]
    pub fn failed(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|failure| failure.kind == kind)
    }

    /// Folds another report into this one.
    pub fn absorb(&mut self, other: CommitReport) {
        self.token_persisted |= other.token_persisted;
        self.document_written |= other.document_written;
        self.remote_changed |= other.remote_changed;
        if self.entry.is_none() {
            self.entry = other.entry;
        }
        self.failures.extend(other.failures);
    }
}
