//! Session management for ghtt.
//!
//! This crate ties the GitHub client, the gist store and the credential
//! store together into a logged-in session whose changes are persisted as
//! they happen.
//!
//! # Overview
//!
//! - [`state`]: The [`Session`], login states and [`CommitReport`]
//! - [`controller`]: [`SessionController`], the login state machine and the
//!   operations on tracked issues and the timer
//! - [`actor`]: [`SessionHandle`], which runs a controller in its own task
//!   so that writes never overlap
//! - [`error`]: Error types for session operations
//!
//! # Persistence
//!
//! Each operation ends with a commit that writes only what changed: the
//! token goes to the credential store and the document goes to the gist.
//! Failed writes do not fail the operation. They are logged and listed in
//! the returned [`CommitReport`], and retried on the next commit.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use ghtt_config::MemoryCredentialStore;
//! use ghtt_github::GistStore;
//! use ghtt_github::fake::{FAKE_TOKEN, FakeGitHub};
//! use ghtt_protocol::dummy::dummy_issues;
//! use ghtt_session::{LoginState, SessionController};
//! use secrecy::SecretString;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ghtt_session::Result<()> {
//! let github = FakeGitHub::new();
//! let mut controller = SessionController::new(
//!     github.clone(),
//!     GistStore::default(),
//!     Arc::new(MemoryCredentialStore::new()),
//! );
//!
//! controller.login(SecretString::from(FAKE_TOKEN.to_string())).await?;
//! assert_eq!(controller.login_state(), LoginState::LoggedIn);
//!
//! let issue = dummy_issues().remove(0);
//! controller.add_issue(issue.clone()).await?;
//! controller.start_timer(issue, Utc::now()).await?;
//! let report = controller.stop_timer(Utc::now()).await?;
//! assert!(report.entry.is_some());
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod controller;
pub mod error;
pub mod state;

// Re-export primary types at crate root for convenience
pub use actor::SessionHandle;
pub use controller::{Mutation, SessionController};
pub use error::{Result, SessionError};
pub use state::{CommitReport, Failure, FailureKind, IssueTimerState, LoginState, Session};
