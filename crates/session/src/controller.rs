//! The session controller.
//!
//! [`SessionController`] owns the [`Session`] and drives the login state
//! machine:
//!
//! ```text
//! LoggedOut --login(token)--> LoggingIn --ok--> LoggedIn
//!                                 |                |
//!                                 +--error--> LoggedOut <--logout()
//! ```
//!
//! Every operation that changes the session ends with [`commit`], which
//! compares the token and the document against what was last persisted and
//! writes only what changed: the token to the [`CredentialStore`], the
//! document to the [`GistStore`]. Write failures never fail the operation;
//! they are logged and returned in the [`CommitReport`].
//!
//! [`commit`]: SessionController::commit

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ghtt_config::CredentialStore;
use ghtt_github::{
    Connector, GistStore, GitHubClient, ListOutcome, RateLimitMonitor, ReadOutcome, Transport,
};
use ghtt_protocol::{
    EntryFormatter, GistDocument, Issue, IssueId, MarkdownEntryFormatter, TimeEntry, UserProfile,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::state::{
    CommitReport, Failure, FailureKind, LoginState, Session, clone_secret, same_token,
};

/// A change to the logged-in session's document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Track an issue.
    AddIssue(Issue),
    /// Stop tracking an issue.
    DropIssue(IssueId),
    /// Start the timer on an issue, replacing any running timer.
    StartTimer {
        /// The issue to time.
        issue: Issue,
        /// Start of the span.
        at: DateTime<Utc>,
    },
    /// Stop the running timer and record its span.
    StopTimer {
        /// End of the span.
        at: DateTime<Utc>,
    },
    /// Record a span of work without touching the timer.
    AddEntry {
        /// The issue worked on.
        issue: Issue,
        /// Start of the span.
        begin: DateTime<Utc>,
        /// End of the span.
        end: DateTime<Utc>,
    },
}

/// Owns the session and persists its changes.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use ghtt_config::MemoryCredentialStore;
/// use ghtt_github::{GistStore, OctocrabConnector};
/// use ghtt_session::SessionController;
/// use secrecy::SecretString;
///
/// # async fn example() -> ghtt_session::Result<()> {
/// let mut controller = SessionController::new(
///     OctocrabConnector::default(),
///     GistStore::default(),
///     Arc::new(MemoryCredentialStore::new()),
/// );
///
/// controller.login(SecretString::from("ghp_your_token".to_string())).await?;
/// println!("tracking {} issues", controller.session().document.issues.len());
/// # Ok(())
/// # }
/// ```
pub struct SessionController<C: Connector> {
    connector: C,
    store: GistStore,
    credentials: Arc<dyn CredentialStore>,
    formatter: Arc<dyn EntryFormatter>,
    monitor: RateLimitMonitor,
    staleness_check: bool,
    session: Session,
    client: Option<GitHubClient<C::Transport>>,
    login_state: watch::Sender<LoginState>,
    synced_token: Option<SecretString>,
    synced_document: Option<GistDocument>,
}

impl<C: Connector> SessionController<C> {
    /// Creates a logged-out controller.
    #[must_use]
    pub fn new(connector: C, store: GistStore, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            connector,
            store,
            credentials,
            formatter: Arc::new(MarkdownEntryFormatter::default()),
            monitor: RateLimitMonitor::new(),
            staleness_check: true,
            session: Session::default(),
            client: None,
            login_state: watch::channel(LoginState::LoggedOut).0,
            synced_token: None,
            synced_document: None,
        }
    }

    /// Sets how time entries are rendered and parsed.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn EntryFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Shares a rate-limit monitor with the clients built at login.
    #[must_use]
    pub fn with_monitor(mut self, monitor: RateLimitMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Enables or disables re-reading the gist before each write.
    #[must_use]
    pub fn with_staleness_check(mut self, enabled: bool) -> Self {
        self.staleness_check = enabled;
        self
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the current login state.
    #[must_use]
    pub fn login_state(&self) -> LoginState {
        *self.login_state.borrow()
    }

    /// Returns whether a login is underway.
    #[must_use]
    pub fn login_in_progress(&self) -> bool {
        self.login_state() == LoginState::LoggingIn
    }

    /// Returns a receiver notified on every login state change.
    #[must_use]
    pub fn subscribe_login_state(&self) -> watch::Receiver<LoginState> {
        self.login_state.subscribe()
    }

    /// Returns the rate-limit monitor.
    #[must_use]
    pub fn rate_limits(&self) -> &RateLimitMonitor {
        &self.monitor
    }

    fn client(&self) -> Result<&GitHubClient<C::Transport>> {
        self.client.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    fn set_login_state(&self, state: LoginState) {
        self.login_state.send_replace(state);
    }

    /// Logs in with `token`.
    ///
    /// Resolves the user, loads the state document (creating or repairing
    /// the gist as needed) and saves the token. On failure the session is
    /// reset to logged out. A previously saved token is cleared only when
    /// GitHub rejected it; after a network or server failure it is kept for
    /// the next attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be resolved or the document
    /// cannot be loaded.
    #[instrument(skip_all)]
    pub async fn login(&mut self, token: SecretString) -> Result<CommitReport> {
        self.set_login_state(LoginState::LoggingIn);

        match self.open(&token).await {
            Ok((client, user, outcome)) => {
                info!(
                    user = %user.login,
                    gist = ?outcome.gist_id,
                    action = ?outcome.action,
                    "logged in"
                );
                let mut report = CommitReport::default();
                match &outcome.write_error {
                    // Leaving the document unsynced makes the commit below retry it.
                    Some(e) => {
                        report.failures.push(Failure::github(FailureKind::Repair, e));
                        self.synced_document = None;
                    }
                    None => self.synced_document = Some(outcome.document.clone()),
                }
                self.session = Session {
                    token: Some(token),
                    user: Some(user),
                    document: outcome.document,
                };
                self.client = Some(client);
                self.set_login_state(LoginState::LoggedIn);

                report.absorb(self.commit().await);
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.reset();
                if matches!(
                    e,
                    SessionError::Github(ghtt_github::Error::TokenValidation { .. })
                ) {
                    self.commit().await;
                } else {
                    self.synced_token = None;
                }
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        token: &SecretString,
    ) -> Result<(GitHubClient<C::Transport>, UserProfile, ReadOutcome)> {
        let client = self.connector.connect(token, self.monitor.clone())?;
        let user = client.get_user().await?;
        let outcome = self.store.read(&client).await?;
        Ok((client, user, outcome))
    }

    /// Logs in with the token saved by a previous login, if there is one.
    ///
    /// A token GitHub rejects is removed from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be read or the login
    /// fails.
    pub async fn restore(&mut self) -> Result<Option<CommitReport>> {
        let Some(token) = self.credentials.load()? else {
            debug!("no stored token");
            return Ok(None);
        };
        let token = SecretString::from(token);
        self.synced_token = Some(clone_secret(&token));
        self.login(token).await.map(Some)
    }

    /// Logs out, discarding the session and the saved token.
    ///
    /// The credential store is cleared even when this controller never
    /// logged in, so a token saved by an earlier run is removed too.
    #[instrument(skip_all)]
    pub async fn logout(&mut self) -> CommitReport {
        info!(user = %self.session.login(), "logging out");
        self.reset();

        let mut report = CommitReport::default();
        match self.credentials.clear() {
            Ok(()) => {
                self.synced_token = None;
                report.token_persisted = true;
            }
            Err(e) => {
                warn!(error = %e, "failed to clear stored token");
                report.failures.push(Failure::credentials(&e));
            }
        }
        report
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.client = None;
        self.synced_document = None;
        self.set_login_state(LoginState::LoggedOut);
    }

    /// Tracks an issue. Already tracked issues are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn add_issue(&mut self, issue: Issue) -> Result<CommitReport> {
        self.mutate(Mutation::AddIssue(issue)).await
    }

    /// Stops tracking an issue. Untracked issues are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn drop_issue(&mut self, id: IssueId) -> Result<CommitReport> {
        self.mutate(Mutation::DropIssue(id)).await
    }

    /// Starts the timer on an issue. A running timer is replaced without
    /// recording its span.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn start_timer(&mut self, issue: Issue, at: DateTime<Utc>) -> Result<CommitReport> {
        self.mutate(Mutation::StartTimer { issue, at }).await
    }

    /// Stops the running timer and posts its span as a comment on the
    /// timed issue. Does nothing when no timer runs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn stop_timer(&mut self, at: DateTime<Utc>) -> Result<CommitReport> {
        self.mutate(Mutation::StopTimer { at }).await
    }

    /// Posts a span of work as a comment on an issue.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn add_entry(
        &mut self,
        issue: Issue,
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<CommitReport> {
        self.mutate(Mutation::AddEntry { issue, begin, end }).await
    }

    /// Applies a mutation and commits.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn mutate(&mut self, mutation: Mutation) -> Result<CommitReport> {
        let mut report = CommitReport::default();
        self.apply(mutation, &mut report).await?;
        report.absorb(self.commit().await);
        Ok(report)
    }

    /// Applies a mutation without committing.
    ///
    /// Time entries are posted right away; their outcome is added to
    /// `report`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    #[instrument(skip_all)]
    pub async fn apply(&mut self, mutation: Mutation, report: &mut CommitReport) -> Result<()> {
        let client = self.client.as_ref().ok_or(SessionError::NotLoggedIn)?;
        let document = &mut self.session.document;

        match mutation {
            Mutation::AddIssue(issue) => {
                let id = issue.id;
                if !document.add_issue(issue) {
                    debug!(issue = id, "issue already tracked");
                }
            }
            Mutation::DropIssue(id) => {
                if !document.drop_issue(id) {
                    debug!(issue = id, "issue not tracked");
                }
            }
            Mutation::StartTimer { issue, at } => {
                let id = issue.id;
                if let Some(previous) = document.start_timer(issue, at) {
                    debug!(previous = previous.issue.id, "replacing running timer");
                }
                debug!(issue = id, %at, "timer started");
            }
            Mutation::StopTimer { at } => {
                let Some(timer) = document.stop_timer() else {
                    debug!("no timer running");
                    return Ok(());
                };
                let entry = TimeEntry::new(self.session.login(), timer.at, at);
                post_entry(client, self.formatter.as_ref(), &timer.issue, entry, report).await;
            }
            Mutation::AddEntry { issue, begin, end } => {
                let entry = TimeEntry::new(self.session.login(), begin, end);
                post_entry(client, self.formatter.as_ref(), &issue, entry, report).await;
            }
        }
        Ok(())
    }

    /// Persists whatever changed since the last commit.
    ///
    /// The token is saved to (or cleared from) the credential store when it
    /// differs from the one last persisted. The document is written to the
    /// gist when it differs from the one last synced; with the staleness
    /// check enabled the gist is re-read first, and a remote copy that moved
    /// on is reported but overwritten. When the gist no longer exists it is
    /// looked up again by description (or created) before writing.
    #[instrument(skip_all)]
    pub async fn commit(&mut self) -> CommitReport {
        let mut report = CommitReport::default();
        self.persist_token(&mut report);
        self.persist_document(&mut report).await;
        report
    }

    fn persist_token(&mut self, report: &mut CommitReport) {
        if same_token(self.session.token.as_ref(), self.synced_token.as_ref()) {
            return;
        }

        let result = match &self.session.token {
            Some(token) => self.credentials.save(token.expose_secret()),
            None => self.credentials.clear(),
        };
        match result {
            Ok(()) => {
                debug!(stored = self.session.token.is_some(), "token persisted");
                self.synced_token = self.session.token.as_ref().map(clone_secret);
                report.token_persisted = true;
            }
            Err(e) => {
                warn!(error = %e, "failed to persist token");
                report.failures.push(Failure::credentials(&e));
            }
        }
    }

    async fn persist_document(&mut self, report: &mut CommitReport) {
        let Some(client) = self.client.as_ref() else {
            return;
        };
        if self.synced_document.as_ref() == Some(&self.session.document) {
            return;
        }

        let baseline = self
            .synced_document
            .as_ref()
            .filter(|synced| self.staleness_check && synced.has_id());
        let mut unresolved = None;
        if let Some(synced) = baseline {
            match self.store.read_by_id(client, &synced.id).await {
                Ok(remote) if remote != *synced => {
                    warn!(gist = %synced.id, "gist changed since last sync, overwriting");
                    report.remote_changed = true;
                }
                Ok(_) => {}
                Err(e) if e.is_resolution_failure() => unresolved = Some(e),
                Err(e) => warn!(error = %e, "could not re-read gist before writing"),
            }
        }

        let mut document = self.session.document.clone();
        let mut written = match unresolved {
            Some(e) => Err(e),
            None => self.store.write(client, &mut document).await,
        };
        if matches!(&written, Err(e) if e.is_resolution_failure()) {
            warn!(gist = %document.id, "state gist is gone, looking it up again");
            written = match self.store.read(client).await {
                Ok(outcome) => {
                    info!(
                        gist = ?outcome.gist_id,
                        action = ?outcome.action,
                        "state gist resolved again"
                    );
                    let previous = self.synced_document.take();
                    if previous.is_some_and(|mut synced| {
                        synced.id.clone_from(&outcome.document.id);
                        synced != outcome.document
                    }) {
                        report.remote_changed = true;
                    }
                    document.id.clone_from(&outcome.document.id);
                    self.session.document.id.clone_from(&outcome.document.id);
                    if outcome.write_error.is_none() {
                        self.synced_document = Some(outcome.document);
                    }
                    self.store.write(client, &mut document).await
                }
                Err(e) => Err(e),
            };
        }

        match written {
            Ok(()) => {
                debug!(gist = %document.id, "document written");
                self.session.document.id.clone_from(&document.id);
                self.synced_document = Some(document);
                report.document_written = true;
            }
            Err(e) => {
                warn!(error = %e, "failed to write document");
                report
                    .failures
                    .push(Failure::github(FailureKind::Document, &e));
            }
        }
    }

    /// Lists the issues assigned to the user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn assigned_issues(&self) -> Result<ListOutcome<Issue>> {
        Ok(self.client()?.fetch_assigned_issues().await)
    }

    /// Lists the time entries recorded on an issue.
    ///
    /// Comments that are not time entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] without a session.
    pub async fn time_entries(&self, issue: &Issue) -> Result<ListOutcome<TimeEntry>> {
        let comments = self.client()?.fetch_issue_comments(issue).await;
        let items = comments
            .items
            .iter()
            .filter_map(|comment| comment.body.as_deref())
            .filter_map(|body| self.formatter.parse(body))
            .collect();
        Ok(ListOutcome {
            resource: comments.resource,
            items,
            pages: comments.pages,
            error: comments.error,
        })
    }
}

async fn post_entry<T: Transport>(
    client: &GitHubClient<T>,
    formatter: &dyn EntryFormatter,
    issue: &Issue,
    entry: TimeEntry,
    report: &mut CommitReport,
) {
    let body = formatter.render(&entry, Utc::now());
    match client.post_comment(issue, &body).await {
        Ok(comment) => debug!(issue = issue.id, comment = comment.id, "time entry posted"),
        Err(e) => {
            warn!(issue = issue.id, error = %e, "failed to post time entry");
            report.failures.push(Failure::github(FailureKind::Comment, &e));
        }
    }
    report.entry = Some(entry);
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use ghtt_config::MemoryCredentialStore;
    use ghtt_github::fake::{FAKE_TOKEN, FakeGitHub, Fault};
    use ghtt_github::{DEFAULT_FILENAME, Method};
    use ghtt_protocol::dummy::dummy_issues;

    use super::*;

    fn controller(github: &FakeGitHub) -> (SessionController<FakeGitHub>, MemoryCredentialStore) {
        controller_with(github, MemoryCredentialStore::new())
    }

    fn controller_with(
        github: &FakeGitHub,
        credentials: MemoryCredentialStore,
    ) -> (SessionController<FakeGitHub>, MemoryCredentialStore) {
        let controller = SessionController::new(
            github.clone(),
            GistStore::default(),
            Arc::new(credentials.clone()),
        );
        (controller, credentials)
    }

    fn token() -> SecretString {
        SecretString::from(FAKE_TOKEN.to_string())
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    async fn logged_in(
        github: &FakeGitHub,
    ) -> (SessionController<FakeGitHub>, MemoryCredentialStore) {
        let (mut controller, credentials) = controller(github);
        controller.login(token()).await.unwrap();
        github.clear_requests();
        (controller, credentials)
    }

    fn remote_document(
        github: &FakeGitHub,
        controller: &SessionController<FakeGitHub>,
    ) -> GistDocument {
        let id = controller.session().gist_id().unwrap();
        GistDocument::from_json(&github.gist_content(id, DEFAULT_FILENAME).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn login_loads_document_and_saves_token() {
        let github = FakeGitHub::new();
        let (mut controller, credentials) = controller(&github);
        let mut states = controller.subscribe_login_state();

        let report = controller.login(token()).await.unwrap();

        assert!(report.token_persisted);
        assert!(!report.document_written);
        assert!(report.is_clean());
        assert_eq!(controller.login_state(), LoginState::LoggedIn);
        assert_eq!(*states.borrow_and_update(), LoginState::LoggedIn);
        assert!(!controller.login_in_progress());
        assert_eq!(controller.session().login(), "octocat");
        assert_eq!(credentials.token().as_deref(), Some(FAKE_TOKEN));

        let gists = github.gists();
        assert_eq!(gists.len(), 1);
        assert_eq!(controller.session().gist_id(), Some(gists[0].id.as_str()));
    }

    #[tokio::test]
    async fn failed_login_resets_session() {
        let github = FakeGitHub::new();
        let (mut controller, credentials) = controller(&github);

        let err = controller
            .login(SecretString::from("wrong".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Github(ghtt_github::Error::TokenValidation { .. })
        ));
        assert_eq!(controller.login_state(), LoginState::LoggedOut);
        assert!(controller.session().user.is_none());
        assert!(controller.session().token.is_none());
        assert_eq!(credentials.writes(), 0);
        assert!(github.gists().is_empty());
    }

    #[tokio::test]
    async fn restore_logs_in_with_stored_token() {
        let github = FakeGitHub::new();
        let (mut controller, credentials) =
            controller_with(&github, MemoryCredentialStore::with_token(FAKE_TOKEN));

        let report = controller.restore().await.unwrap().unwrap();

        assert!(!report.token_persisted);
        assert_eq!(credentials.writes(), 0);
        assert_eq!(controller.login_state(), LoginState::LoggedIn);
    }

    #[tokio::test]
    async fn restore_without_stored_token_stays_logged_out() {
        let github = FakeGitHub::new();
        let (mut controller, _) = controller(&github);

        assert!(controller.restore().await.unwrap().is_none());
        assert_eq!(controller.login_state(), LoginState::LoggedOut);
        assert!(github.requests().is_empty());
    }

    #[tokio::test]
    async fn revoked_stored_token_is_cleared() {
        let github = FakeGitHub::new();
        github.revoke_tokens();
        let (mut controller, credentials) =
            controller_with(&github, MemoryCredentialStore::with_token("revoked"));

        assert!(controller.restore().await.is_err());
        assert_eq!(credentials.token(), None);
        assert_eq!(controller.login_state(), LoginState::LoggedOut);
    }

    #[tokio::test]
    async fn transient_login_failure_keeps_stored_token() {
        let github = FakeGitHub::new();
        github.fail(Method::Get, "/user", Fault::Transport);
        github.fail(Method::Get, "/gists", Fault::Status(503));
        let (mut controller, credentials) =
            controller_with(&github, MemoryCredentialStore::with_token(FAKE_TOKEN));

        let err = controller.restore().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Github(ghtt_github::Error::Transport(_))
        ));
        assert_eq!(controller.login_state(), LoginState::LoggedOut);
        assert_eq!(credentials.token().as_deref(), Some(FAKE_TOKEN));

        let err = controller.restore().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Github(ghtt_github::Error::IncompleteListing { .. })
        ));
        assert_eq!(credentials.token().as_deref(), Some(FAKE_TOKEN));
        assert_eq!(credentials.writes(), 0);

        let report = controller.restore().await.unwrap().unwrap();
        assert!(!report.token_persisted);
        assert_eq!(controller.login_state(), LoginState::LoggedIn);
    }

    #[tokio::test]
    async fn repair_failure_is_reported_and_retried() {
        let github = FakeGitHub::new();
        let id = github.insert_gist(
            Some("GHTT-state"),
            [(DEFAULT_FILENAME, r#"{"id": "stale", "issues": []}"#)],
        );
        github.fail(Method::Patch, "/gists", Fault::Status(500));
        let (mut controller, _) = controller(&github);

        let report = controller.login(token()).await.unwrap();

        assert!(report.failed(FailureKind::Repair));
        assert!(report.document_written);
        assert_eq!(controller.session().gist_id(), Some(id.as_str()));
        assert_eq!(remote_document(&github, &controller).id, id);
    }

    #[tokio::test]
    async fn token_save_failure_is_reported() {
        let github = FakeGitHub::new();
        let credentials = MemoryCredentialStore::new();
        credentials.set_failing(true);
        let (mut controller, _) = controller_with(&github, credentials);

        let report = controller.login(token()).await.unwrap();

        assert!(report.failed(FailureKind::Credentials));
        assert_eq!(controller.login_state(), LoginState::LoggedIn);
    }

    #[tokio::test]
    async fn mutations_need_a_session() {
        let github = FakeGitHub::new();
        let (mut controller, _) = controller(&github);

        let issue = dummy_issues().remove(0);
        assert!(matches!(
            controller.add_issue(issue).await,
            Err(SessionError::NotLoggedIn)
        ));
        assert!(matches!(
            controller.stop_timer(at(10, 0)).await,
            Err(SessionError::NotLoggedIn)
        ));
        assert!(matches!(
            controller.assigned_issues().await,
            Err(SessionError::NotLoggedIn)
        ));
    }

    #[tokio::test]
    async fn add_issue_keeps_titles_sorted() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;

        for issue in dummy_issues() {
            let report = controller.add_issue(issue).await.unwrap();
            assert!(report.document_written);
        }

        let titles: Vec<_> = controller
            .session()
            .document
            .issues
            .iter()
            .map(|issue| issue.title.as_str())
            .collect();
        assert_eq!(
            titles,
            [
                "Add CSV export",
                "Broken link in README",
                "crash when the config file is empty",
                "Flaky login test",
                "Update onboarding guide",
            ]
        );
        assert_eq!(remote_document(&github, &controller), controller.session().document);
    }

    #[tokio::test]
    async fn unchanged_document_is_not_written() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issue = dummy_issues().remove(0);
        controller.add_issue(issue.clone()).await.unwrap();
        github.clear_requests();

        let report = controller.add_issue(issue).await.unwrap();

        assert!(!report.document_written);
        assert!(github.requests().is_empty());
    }

    #[tokio::test]
    async fn drop_issue_twice_is_a_noop() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issue = dummy_issues().remove(0);
        controller.add_issue(issue.clone()).await.unwrap();

        assert!(controller.drop_issue(issue.id).await.unwrap().document_written);
        assert!(!controller.drop_issue(issue.id).await.unwrap().document_written);
        assert!(controller.session().document.issues.is_empty());
    }

    #[tokio::test]
    async fn last_started_timer_wins() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issues = dummy_issues();
        let (a, b) = (&issues[0], &issues[1]);

        controller.start_timer(a.clone(), at(9, 0)).await.unwrap();
        controller.start_timer(b.clone(), at(9, 30)).await.unwrap();
        assert_eq!(controller.session().document.active_issue_id(), Some(b.id));
        assert_eq!(controller.session().timer_started_at(), Some(at(9, 30)));

        let report = controller.stop_timer(at(11, 0)).await.unwrap();

        let entry = report.entry.unwrap();
        assert_eq!(entry.begin, at(9, 30));
        assert_eq!(entry.end, at(11, 0));
        assert_eq!(entry.user, "octocat");
        assert!(report.document_written);
        assert!(controller.session().document.start.is_none());
        assert!(remote_document(&github, &controller).start.is_none());

        let comments = github.comments("octocat", "tracker", b.number);
        assert_eq!(comments.len(), 1);
        assert_eq!(MarkdownEntryFormatter::default().parse(&comments[0]), Some(entry));
        assert!(github.comments("octocat", "handbook", a.number).is_empty());
    }

    #[tokio::test]
    async fn stop_without_timer_does_nothing() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;

        let report = controller.stop_timer(at(10, 0)).await.unwrap();

        assert_eq!(report, CommitReport::default());
        assert!(github.requests().is_empty());
    }

    #[tokio::test]
    async fn comment_failure_does_not_fail_stop() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issue = dummy_issues().remove(0);
        controller.start_timer(issue, at(9, 0)).await.unwrap();
        github.fail(Method::Post, "/repos", Fault::Status(500));

        let report = controller.stop_timer(at(10, 0)).await.unwrap();

        assert!(report.failed(FailureKind::Comment));
        assert!(report.entry.is_some());
        assert!(report.document_written);
        assert!(controller.session().document.start.is_none());
    }

    #[tokio::test]
    async fn add_entry_leaves_timer_alone() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issues = dummy_issues();
        controller.start_timer(issues[0].clone(), at(9, 0)).await.unwrap();

        let report = controller
            .add_entry(issues[2].clone(), at(7, 0), at(8, 15))
            .await
            .unwrap();

        assert_eq!(report.entry.unwrap().duration(), TimeDelta::minutes(75));
        assert!(!report.document_written);
        assert_eq!(controller.session().document.active_issue_id(), Some(issues[0].id));
        assert_eq!(github.comments("octocat", "tracker", issues[2].number).len(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_reported_and_retried_next_commit() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issues = dummy_issues();
        github.fail(Method::Patch, "/gists", Fault::Status(502));

        let report = controller.add_issue(issues[0].clone()).await.unwrap();
        assert!(report.failed(FailureKind::Document));
        assert!(!report.document_written);
        assert!(remote_document(&github, &controller).issues.is_empty());

        let report = controller.add_issue(issues[1].clone()).await.unwrap();
        assert!(report.document_written);
        assert_eq!(remote_document(&github, &controller).issues.len(), 2);
    }

    #[tokio::test]
    async fn remote_changes_are_reported_then_overwritten() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issues = dummy_issues();
        let id = controller.session().gist_id().unwrap().to_string();

        let mut elsewhere = GistDocument {
            id: id.clone(),
            ..Default::default()
        };
        elsewhere.add_issue(issues[3].clone());
        github.set_gist_content(&id, DEFAULT_FILENAME, &elsewhere.to_pretty_json().unwrap());

        let report = controller.add_issue(issues[0].clone()).await.unwrap();

        assert!(report.remote_changed);
        assert!(report.document_written);
        let remote = remote_document(&github, &controller);
        assert_eq!(remote, controller.session().document);
        assert!(!remote.contains(issues[3].id));
    }

    #[tokio::test]
    async fn staleness_check_can_be_disabled() {
        let github = FakeGitHub::new();
        let (controller, _) = logged_in(&github).await;
        let mut controller = controller.with_staleness_check(false);
        let id = controller.session().gist_id().unwrap().to_string();

        let report = controller.add_issue(dummy_issues().remove(0)).await.unwrap();

        assert!(!report.remote_changed);
        assert_eq!(github.count(Method::Get, &format!("/gists/{id}")), 0);
        assert_eq!(github.count(Method::Patch, &format!("/gists/{id}")), 1);
    }

    #[tokio::test]
    async fn deleted_gist_is_looked_up_again_before_writing() {
        let github = FakeGitHub::new();
        let (controller, _) = logged_in(&github).await;
        let mut controller = controller.with_staleness_check(false);
        let issues = dummy_issues();
        let deleted = controller.session().gist_id().unwrap().to_string();
        github.delete_gist(&deleted);

        let report = controller.add_issue(issues[0].clone()).await.unwrap();

        assert!(report.is_clean());
        assert!(report.document_written);
        let gists = github.gists();
        assert_eq!(gists.len(), 1);
        assert_ne!(gists[0].id, deleted);
        assert_eq!(controller.session().gist_id(), Some(gists[0].id.as_str()));
        assert_eq!(remote_document(&github, &controller), controller.session().document);

        github.clear_requests();
        let report = controller.add_issue(issues[1].clone()).await.unwrap();
        assert!(report.document_written);
        assert_eq!(github.count(Method::Patch, &format!("/gists/{deleted}")), 0);
        assert_eq!(github.count(Method::Patch, &format!("/gists/{}", gists[0].id)), 1);
    }

    #[tokio::test]
    async fn renamed_gist_is_replaced_by_tagged_one() {
        let github = FakeGitHub::new();
        let (mut controller, _) = logged_in(&github).await;
        let issues = dummy_issues();
        let renamed = controller.session().gist_id().unwrap().to_string();
        github.set_gist_description(&renamed, Some("old timesheet"));

        let replacement = github.insert_gist(Some("GHTT-state"), [(DEFAULT_FILENAME, "{}")]);
        let mut elsewhere = GistDocument {
            id: replacement.clone(),
            ..Default::default()
        };
        elsewhere.add_issue(issues[3].clone());
        github.set_gist_content(
            &replacement,
            DEFAULT_FILENAME,
            &elsewhere.to_pretty_json().unwrap(),
        );
        github.clear_requests();

        let report = controller.add_issue(issues[0].clone()).await.unwrap();

        assert!(report.document_written);
        assert!(report.remote_changed);
        assert_eq!(controller.session().gist_id(), Some(replacement.as_str()));
        assert_eq!(github.count(Method::Patch, &format!("/gists/{renamed}")), 0);
        let remote = remote_document(&github, &controller);
        assert_eq!(remote, controller.session().document);
        assert!(remote.contains(issues[0].id));
        assert_eq!(
            github.gist(&renamed).unwrap().description.as_deref(),
            Some("old timesheet")
        );
    }

    #[tokio::test]
    async fn logout_clears_session_and_token() {
        let github = FakeGitHub::new();
        let (mut controller, credentials) = logged_in(&github).await;

        let report = controller.logout().await;

        assert!(report.token_persisted);
        assert_eq!(credentials.token(), None);
        assert_eq!(controller.login_state(), LoginState::LoggedOut);
        assert_eq!(controller.session().document, GistDocument::default());
        assert!(github.requests().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_token_saved_by_earlier_run() {
        let github = FakeGitHub::new();
        let (mut controller, credentials) =
            controller_with(&github, MemoryCredentialStore::with_token(FAKE_TOKEN));

        let report = controller.logout().await;

        assert!(report.is_clean());
        assert_eq!(credentials.token(), None);
    }

    #[tokio::test]
    async fn lists_assigned_issues_and_time_entries() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(dummy_issues());
        let (controller, _) = logged_in(&github).await;

        let assigned = controller.assigned_issues().await.unwrap();
        assert!(assigned.is_complete());
        assert_eq!(assigned.items[0].title, "Add CSV export");

        let issue = &assigned.items[0];
        let formatter = MarkdownEntryFormatter::default();
        let entry = TimeEntry::new("hubot", at(9, 0), at(9, 45));
        github.add_comment("octocat", "tracker", issue.number, "LGTM");
        github.add_comment(
            "octocat",
            "tracker",
            issue.number,
            &formatter.render(&entry, at(9, 45)),
        );

        let entries = controller.time_entries(issue).await.unwrap();
        assert_eq!(entries.items, [entry]);
    }

    #[tokio::test]
    async fn shares_rate_limit_monitor_with_clients() {
        let github = FakeGitHub::new();
        let monitor = RateLimitMonitor::new();
        let (controller, _) = controller(&github);
        let mut controller = controller.with_monitor(monitor.clone());

        controller.login(token()).await.unwrap();

        assert!(monitor.get("core").is_some());
        assert!(controller.rate_limits().get("core").is_some());
    }
}
