//! GitHub issues as tracked by ghtt.
//!
//! Issues are sourced from the GitHub API and never created locally. ghtt
//! only needs a handful of their fields (identifier, number, title and owning
//! repository); every other field returned by GitHub is kept verbatim in
//! [`Issue::extra`] so that the persisted state document round-trips the
//! objects it was given.
//!
//! # Examples
//!
//! ```
//! use ghtt_protocol::{Issue, IssueRef};
//!
//! let issue = Issue::new(7, 42, "Fix the flux capacitor", "doc", "delorean");
//! let reference: IssueRef = "doc/delorean#42".parse().unwrap();
//! assert!(reference.matches(&issue));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};

/// Identifier GitHub assigns to an issue, unique across repositories.
pub type IssueId = u64;

/// A GitHub account, as embedded in other API objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The account login (e.g. `octocat`).
    pub login: String,
    /// Remaining fields returned by GitHub.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The repository an issue belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRef {
    /// The repository name, without its owner.
    pub name: String,
    /// The account owning the repository.
    pub owner: Account,
    /// Remaining fields returned by GitHub.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A GitHub issue.
///
/// Equality is structural over every field, including the opaque extras, so
/// two snapshots of the same issue taken at different times may differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Globally unique issue identifier.
    pub id: IssueId,
    /// Issue number within its repository.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Owning repository. Only present on user-scoped issue listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryRef>,
    /// Remaining fields returned by GitHub.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Creates an issue with just the fields ghtt relies on.
    #[must_use]
    pub fn new(
        id: IssueId,
        number: u64,
        title: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            id,
            number,
            title: title.into(),
            repository: Some(RepositoryRef {
                name: repo.into(),
                owner: Account {
                    login: owner.into(),
                    extra: Map::new(),
                },
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Returns the login of the repository owner, if known.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.owner.login.as_str())
    }

    /// Returns the repository name, if known.
    #[must_use]
    pub fn repo(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.name.as_str())
    }

    /// Returns the `owner/repo#number` reference of this issue, if the
    /// owning repository is known.
    #[must_use]
    pub fn reference(&self) -> Option<IssueRef> {
        let repository = self.repository.as_ref()?;
        Some(IssueRef {
            owner: repository.owner.login.clone(),
            repo: repository.name.clone(),
            number: self.number,
        })
    }
}

/// Compares two issue titles the way a human-facing list expects.
///
/// Titles are ordered case-insensitively first; titles differing only in
/// case put the lowercase spelling first.
#[must_use]
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| b.cmp(a))
}

/// Sorts issues by title using [`compare_titles`].
pub fn sort_by_title(issues: &mut [Issue]) {
    issues.sort_by(|a, b| compare_titles(&a.title, &b.title));
}

/// A human-typed reference to an issue: `owner/repo#number`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueRef {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Issue number.
    pub number: u64,
}

impl IssueRef {
    /// Returns whether `issue` is the issue this reference points to.
    ///
    /// Owner and repository names compare case-insensitively, as GitHub does.
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        issue.number == self.number
            && issue
                .owner()
                .is_some_and(|owner| owner.eq_ignore_ascii_case(&self.owner))
            && issue
                .repo()
                .is_some_and(|repo| repo.eq_ignore_ascii_case(&self.repo))
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

impl FromStr for IssueRef {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| ProtocolError::InvalidIssueRef {
            input: s.to_string(),
            reason,
        };

        let (repository, number) = s.trim().split_once('#').ok_or_else(|| invalid("missing '#'"))?;
        let (owner, repo) = repository
            .split_once('/')
            .ok_or_else(|| invalid("expected 'owner/repo' before '#'"))?;

        let owner = owner.trim();
        let repo = repo.trim();
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid("expected 'owner/repo' before '#'"));
        }

        let number = number
            .trim()
            .parse()
            .map_err(|_| invalid("issue number is not a positive integer"))?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_github_issue_and_keeps_unknown_fields() {
        let json = r#"{
            "id": 1,
            "number": 12,
            "title": "Broken build",
            "state": "open",
            "html_url": "https://github.com/octo/app/issues/12",
            "repository": {
                "name": "app",
                "full_name": "octo/app",
                "owner": { "login": "octo", "id": 99 }
            }
        }"#;

        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.owner(), Some("octo"));
        assert_eq!(issue.repo(), Some("app"));
        assert_eq!(issue.extra["state"], "open");

        let back = serde_json::to_value(&issue).unwrap();
        assert_eq!(back["repository"]["full_name"], "octo/app");
        assert_eq!(back["repository"]["owner"]["id"], 99);
        assert_eq!(back["html_url"], "https://github.com/octo/app/issues/12");
    }

    #[test]
    fn issue_without_repository() {
        let issue: Issue = serde_json::from_str(r#"{"id": 1, "number": 2, "title": "t"}"#).unwrap();
        assert!(issue.repository.is_none());
        assert!(issue.reference().is_none());
        assert!(!serde_json::to_string(&issue).unwrap().contains("repository"));
    }

    #[test]
    fn compare_titles_ignores_case_first() {
        assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_titles("Zebra", "apple"), Ordering::Greater);
        assert_eq!(compare_titles("same", "same"), Ordering::Equal);
    }

    #[test]
    fn compare_titles_puts_lowercase_first_on_ties() {
        assert_eq!(compare_titles("a", "A"), Ordering::Less);
        assert_eq!(compare_titles("Task", "task"), Ordering::Greater);
    }

    #[test]
    fn sort_by_title_orders_issues() {
        let mut issues = vec![
            Issue::new(1, 1, "charlie", "o", "r"),
            Issue::new(2, 2, "Alpha", "o", "r"),
            Issue::new(3, 3, "bravo", "o", "r"),
        ];
        sort_by_title(&mut issues);
        let titles: Vec<_> = issues.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Alpha", "bravo", "charlie"]);
    }

    #[test]
    fn parse_issue_ref() {
        let reference: IssueRef = "rust-lang/rust#123".parse().unwrap();
        assert_eq!(reference.owner, "rust-lang");
        assert_eq!(reference.repo, "rust");
        assert_eq!(reference.number, 123);
        assert_eq!(reference.to_string(), "rust-lang/rust#123");
    }

    #[test]
    fn parse_issue_ref_rejects_malformed_input() {
        for input in ["rust-lang/rust", "rust#1", "/rust#1", "a/b/c#1", "a/b#x", "a/b#-1"] {
            assert!(input.parse::<IssueRef>().is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn issue_ref_matches_case_insensitively() {
        let issue = Issue::new(5, 9, "t", "Octo", "App");
        let reference: IssueRef = "octo/app#9".parse().unwrap();
        assert!(reference.matches(&issue));

        let other: IssueRef = "octo/app#10".parse().unwrap();
        assert!(!other.matches(&issue));
    }
}
