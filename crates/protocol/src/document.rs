//! The state document persisted in the user's gist.
//!
//! One [`GistDocument`] exists per GitHub account. It records the issues the
//! user tracks and the timer currently running, and carries the identifier
//! of the gist that contains it so that later writes can patch that gist in
//! place.
//!
//! The document maintains two invariants on its own:
//!
//! - tracked issues stay sorted by title (see [`compare_titles`]);
//! - at most one timer is active; starting another replaces it.
//!
//! # Examples
//!
//! ```
//! use chrono::Utc;
//! use ghtt_protocol::{GistDocument, Issue};
//!
//! let mut doc = GistDocument::default();
//! doc.add_issue(Issue::new(2, 2, "Write docs", "octo", "app"));
//! doc.add_issue(Issue::new(1, 1, "Fix bug", "octo", "app"));
//! assert_eq!(doc.issues[0].title, "Fix bug");
//!
//! doc.start_timer(doc.issues[1].clone(), Utc::now());
//! assert!(doc.stop_timer().is_some());
//! assert!(doc.start.is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::issue::{Issue, IssueId, compare_titles};

/// A running timer, bound to exactly one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTimer {
    /// The issue time is being tracked for.
    pub issue: Issue,
    /// When the timer was started.
    pub at: DateTime<Utc>,
}

/// The state document stored in the gist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GistDocument {
    /// Identifier of the gist containing this document. Empty until the
    /// gist has been created.
    #[serde(default)]
    pub id: String,
    /// Tracked issues, sorted by title.
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// The active timer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ActiveTimer>,
}

impl GistDocument {
    /// Returns whether the remote store has assigned this document an id.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Returns whether an issue with the given id is tracked.
    #[must_use]
    pub fn contains(&self, id: IssueId) -> bool {
        self.issues.iter().any(|issue| issue.id == id)
    }

    /// Tracks an issue, keeping the list sorted by title.
    ///
    /// Returns `false` if the issue was already tracked.
    pub fn add_issue(&mut self, issue: Issue) -> bool {
        if self.contains(issue.id) {
            return false;
        }
        let at = self
            .issues
            .partition_point(|existing| compare_titles(&existing.title, &issue.title).is_le());
        self.issues.insert(at, issue);
        true
    }

    /// Stops tracking the issue with the given id.
    ///
    /// Returns `false` if the issue was not tracked.
    pub fn drop_issue(&mut self, id: IssueId) -> bool {
        let before = self.issues.len();
        self.issues.retain(|issue| issue.id != id);
        self.issues.len() < before
    }

    /// Starts a timer on `issue`, replacing any timer already running.
    ///
    /// Returns the replaced timer.
    pub fn start_timer(&mut self, issue: Issue, at: DateTime<Utc>) -> Option<ActiveTimer> {
        self.start.replace(ActiveTimer { issue, at })
    }

    /// Clears the active timer and returns it.
    pub fn stop_timer(&mut self) -> Option<ActiveTimer> {
        self.start.take()
    }

    /// Returns the id of the issue the active timer runs on.
    #[must_use]
    pub fn active_issue_id(&self) -> Option<IssueId> {
        self.start.as_ref().map(|timer| timer.issue.id)
    }

    /// Serializes the document as pretty-printed JSON, the gist file format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ProtocolError::SerializationFailed)
    }

    /// Parses a document from gist file content.
    ///
    /// Tracked issues are re-sorted, so a document edited by hand still
    /// honours the ordering invariant once loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a valid document.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut document: Self =
            serde_json::from_str(content).map_err(ProtocolError::DeserializationFailed)?;
        document
            .issues
            .sort_by(|a, b| compare_titles(&a.title, &b.title));
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn issue(id: u64, title: &str) -> Issue {
        Issue::new(id, id, title, "octo", "app")
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn add_issue_keeps_titles_sorted() {
        let mut doc = GistDocument::default();
        doc.add_issue(issue(1, "delta"));
        doc.add_issue(issue(2, "Alpha"));
        doc.add_issue(issue(3, "charlie"));
        doc.add_issue(issue(4, "Bravo"));

        let titles: Vec<_> = doc.issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "Bravo", "charlie", "delta"]);
    }

    #[test]
    fn add_issue_ignores_already_tracked_issue() {
        let mut doc = GistDocument::default();
        assert!(doc.add_issue(issue(1, "one")));
        assert!(!doc.add_issue(issue(1, "one, renamed")));
        assert_eq!(doc.issues.len(), 1);
        assert_eq!(doc.issues[0].title, "one");
    }

    #[test]
    fn drop_issue_twice_is_a_noop() {
        let mut doc = GistDocument::default();
        doc.add_issue(issue(1, "one"));
        doc.add_issue(issue(2, "two"));

        assert!(doc.drop_issue(1));
        let after_first = doc.clone();
        assert!(!doc.drop_issue(1));
        assert_eq!(doc, after_first);
    }

    #[test]
    fn start_timer_overwrites_running_timer() {
        let mut doc = GistDocument::default();
        assert!(doc.start_timer(issue(1, "a"), at(9, 0)).is_none());

        let replaced = doc.start_timer(issue(2, "b"), at(10, 0)).unwrap();
        assert_eq!(replaced.issue.id, 1);

        let active = doc.start.as_ref().unwrap();
        assert_eq!(active.issue.id, 2);
        assert_eq!(active.at, at(10, 0));
        assert_eq!(doc.active_issue_id(), Some(2));
    }

    #[test]
    fn stop_timer_without_active_timer() {
        let mut doc = GistDocument::default();
        assert!(doc.stop_timer().is_none());
    }

    #[test]
    fn empty_document_format() {
        let json = GistDocument::default().to_pretty_json().unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "id": "",
          "issues": []
        }
        "#);
    }

    #[test]
    fn document_with_issue_format() {
        let mut doc = GistDocument {
            id: "abc123".to_string(),
            ..Default::default()
        };
        doc.add_issue(Issue::new(1, 4, "Fix it", "octo", "app"));

        insta::assert_snapshot!(doc.to_pretty_json().unwrap(), @r#"
        {
          "id": "abc123",
          "issues": [
            {
              "id": 1,
              "number": 4,
              "title": "Fix it",
              "repository": {
                "name": "app",
                "owner": {
                  "login": "octo"
                }
              }
            }
          ]
        }
        "#);
    }

    #[test]
    fn timer_serializes_start_timestamp() {
        let mut doc = GistDocument::default();
        doc.start_timer(issue(1, "a"), at(9, 30));

        let value: serde_json::Value =
            serde_json::from_str(&doc.to_pretty_json().unwrap()).unwrap();
        assert_eq!(value["start"]["issue"]["id"], 1);
        assert_eq!(value["start"]["at"], "2024-05-01T09:30:00Z");
    }

    #[test]
    fn from_json_accepts_browser_timestamps_and_sorts() {
        let content = r#"{
            "id": "g1",
            "issues": [
                {"id": 2, "number": 2, "title": "zeta"},
                {"id": 1, "number": 1, "title": "alpha"}
            ],
            "start": {
                "issue": {"id": 2, "number": 2, "title": "zeta"},
                "at": "2024-05-01T09:30:00.000Z"
            }
        }"#;

        let doc = GistDocument::from_json(content).unwrap();
        assert_eq!(doc.id, "g1");
        assert_eq!(doc.issues[0].title, "alpha");
        assert_eq!(doc.start.unwrap().at, at(9, 30));
    }

    #[test]
    fn from_json_defaults_missing_fields() {
        let doc = GistDocument::from_json("{}").unwrap();
        assert_eq!(doc, GistDocument::default());
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            GistDocument::from_json("not json"),
            Err(ProtocolError::DeserializationFailed(_))
        ));
    }

    proptest! {
        #[test]
        fn issues_stay_sorted_for_any_insertion_order(
            titles in proptest::collection::vec("[a-zA-Z ]{0,8}", 0..20)
        ) {
            let mut doc = GistDocument::default();
            for (id, title) in titles.iter().enumerate() {
                doc.add_issue(issue(id as u64, title));
            }

            prop_assert_eq!(doc.issues.len(), titles.len());
            for pair in doc.issues.windows(2) {
                prop_assert!(compare_titles(&pair[0].title, &pair[1].title).is_le());
            }
        }
    }
}
