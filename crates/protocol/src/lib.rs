//! Shared protocol types for the ghtt time tracker.
//!
//! This crate defines the data exchanged between the GitHub client, the gist
//! store and the session controller.
//!
//! # Overview
//!
//! - [`issue`]: GitHub issues, title ordering and `owner/repo#number` references
//! - [`user`]: The authenticated user's profile
//! - [`document`]: The state document persisted in the user's gist
//! - [`entry`]: Time entries and their rendering as issue comments
//! - [`error`]: Error types for protocol operations
//!
//! # Examples
//!
//! Tracking issues and running a timer on one of them:
//!
//! ```
//! use chrono::Utc;
//! use ghtt_protocol::{GistDocument, dummy::dummy_issues};
//!
//! let mut doc = GistDocument::default();
//! for issue in dummy_issues() {
//!     doc.add_issue(issue);
//! }
//! assert_eq!(doc.issues[0].title, "Add CSV export");
//!
//! let issue = doc.issues[0].clone();
//! doc.start_timer(issue, Utc::now());
//! assert_eq!(doc.active_issue_id(), Some(1003));
//! ```

pub mod document;
pub mod dummy;
pub mod entry;
pub mod error;
pub mod issue;
pub mod user;

// Re-export primary types at crate root for convenience
pub use document::{ActiveTimer, GistDocument};
pub use entry::{EntryFormatter, MarkdownEntryFormatter, TimeEntry, TimerInfo, parse_timer_info};
pub use error::{ProtocolError, Result};
pub use issue::{Account, Issue, IssueId, IssueRef, RepositoryRef, compare_titles, sort_by_title};
pub use user::{UNKNOWN_USER, UserProfile};
