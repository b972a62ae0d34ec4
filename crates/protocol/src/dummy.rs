//! Sample data for tests and demonstrations.
//!
//! # Examples
//!
//! ```
//! use ghtt_protocol::dummy::{dummy_issues, dummy_user};
//!
//! let issues = dummy_issues();
//! assert_eq!(issues.len(), 5);
//! assert_eq!(dummy_user().login, "octocat");
//! ```

use crate::issue::Issue;
use crate::user::UserProfile;

/// Returns the profile of the sample user.
#[must_use]
pub fn dummy_user() -> UserProfile {
    let mut user = UserProfile::new("octocat", 583_231);
    user.name = Some("The Octocat".to_string());
    user
}

/// Returns a handful of issues spread over two repositories, deliberately
/// not sorted by title.
#[must_use]
pub fn dummy_issues() -> Vec<Issue> {
    vec![
        Issue::new(1001, 12, "Update onboarding guide", "octocat", "handbook"),
        Issue::new(1002, 7, "crash when the config file is empty", "octocat", "tracker"),
        Issue::new(1003, 31, "Add CSV export", "octocat", "tracker"),
        Issue::new(1004, 3, "Broken link in README", "octocat", "handbook"),
        Issue::new(1005, 44, "Flaky login test", "octocat", "tracker"),
    ]
}
