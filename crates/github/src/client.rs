//! GitHub API client implementation.
//!
//! This module provides [`GitHubClient`], which wraps the handful of GitHub
//! endpoints ghtt uses. Every response, successful or not, is forwarded to
//! the client's [`RateLimitMonitor`].
//!
//! List endpoints are fetched page by page until their [`PagePolicy`] says
//! the last page was reached. A failed page ends the listing early; the
//! items gathered so far are returned together with the error in a
//! [`ListOutcome`] instead of failing the whole call.

use chrono::Utc;
use ghtt_protocol::{Issue, UserProfile, sort_by_title};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::models::{Comment, Gist, GistPayload};
use crate::pagination::{DEFAULT_PER_PAGE, ListOutcome, PagePolicy, effective_per_page};
use crate::ratelimit::{REMAINING_HEADER, RateLimitMonitor, RateLimitRecord};
use crate::transport::{ApiRequest, ApiResponse, OctocrabTransport, Transport};

/// Base URL of the public GitHub API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Query parameter carrying a timestamp to defeat HTTP caches.
pub const CACHE_BUST_PARAM: &str = "t";

/// GitHub API client.
///
/// The client is generic over its [`Transport`] so that tests can run it
/// against an in-memory GitHub; production code uses the default
/// [`OctocrabTransport`].
///
/// # Examples
///
/// ```no_run
/// use secrecy::SecretString;
/// use ghtt_github::GitHubClient;
///
/// # async fn example() -> ghtt_github::Result<()> {
/// let token = SecretString::from("ghp_your_token".to_string());
/// let client = GitHubClient::new(Some(token))?;
///
/// let user = client.get_user().await?;
/// let issues = client.fetch_assigned_issues().await;
/// println!("{} has {} assigned issues", user.login, issues.items.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GitHubClient<T = OctocrabTransport> {
    transport: T,
    monitor: RateLimitMonitor,
    api_base: String,
    per_page: u8,
    authenticated: bool,
}

impl GitHubClient<OctocrabTransport> {
    /// Creates a client talking to the public GitHub API.
    ///
    /// An absent or empty token yields an unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if the octocrab client fails to initialize.
    pub fn new(token: Option<SecretString>) -> Result<Self> {
        let token = token.filter(|token| !token.expose_secret().is_empty());
        let transport = OctocrabTransport::new(token.as_ref())?;
        Ok(Self::with_transport(transport, token.is_some()))
    }
}

impl<T: Transport> GitHubClient<T> {
    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: T, authenticated: bool) -> Self {
        Self {
            transport,
            monitor: RateLimitMonitor::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            per_page: DEFAULT_PER_PAGE,
            authenticated,
        }
    }

    /// Shares an existing rate-limit monitor with this client.
    #[must_use]
    pub fn with_monitor(mut self, monitor: RateLimitMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    /// Points the client at another API root, such as a GitHub Enterprise
    /// server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the page size used by list endpoints, clamped to `1..=100`.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u8) -> Self {
        self.per_page = effective_per_page(per_page);
        self
    }

    /// Returns whether this client sends a token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns the rate-limit monitor fed by this client.
    #[must_use]
    pub fn monitor(&self) -> &RateLimitMonitor {
        &self.monitor
    }

    /// Returns the page size used by list endpoints.
    #[must_use]
    pub fn per_page(&self) -> u8 {
        self.per_page
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds an API URL from path segments, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        let invalid = |reason: String| Error::InvalidUrl {
            url: self.api_base.clone(),
            reason,
        };
        let mut url = Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// Sends a request, records its rate-limit headers, and maps error
    /// statuses to [`Error`]s.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.url.clone();
        debug!(method = ?request.method, %url, "sending request");

        let response = self.transport.send(request).await?;
        self.monitor.record(&response.headers);

        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&url, &response))
        }
    }

    async fn execute_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let url = request.url.clone();
        self.execute(request).await?.json(&url)
    }

    /// Fetches the profile of the token's owner (`GET /user`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenValidation`] if GitHub rejects the token, and
    /// other errors for transport failures.
    #[instrument(skip(self))]
    pub async fn get_user(&self) -> Result<UserProfile> {
        let request = ApiRequest::get(self.endpoint(&["user"])?);
        match self.execute_json::<UserProfile>(request).await {
            Ok(user) => {
                debug!(login = %user.login, "resolved user");
                Ok(user)
            }
            Err(Error::Http {
                status: 401,
                message,
                ..
            }) => {
                warn!(%message, "token rejected");
                Err(Error::TokenValidation { reason: message })
            }
            Err(e) => Err(e),
        }
    }

    /// Validates the current token by calling `GET /user`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if authenticated and the token is valid
    /// - `Ok(false)` if the client has no token
    /// - `Err` if the token is rejected or the call fails
    ///
    /// # Errors
    ///
    /// See [`get_user`](Self::get_user).
    pub async fn validate_token(&self) -> Result<bool> {
        if !self.authenticated {
            debug!("client is not authenticated, skipping validation");
            return Ok(false);
        }
        self.get_user().await.map(|_| true)
    }

    /// Fetches every page of a list endpoint.
    ///
    /// `request` is the first-page request without paging parameters;
    /// `page` and `per_page` are added for each page. `on_page` is called
    /// with the length of every page received.
    pub async fn fetch_all<R, F>(
        &self,
        resource: &'static str,
        request: ApiRequest,
        policy: PagePolicy,
        mut on_page: F,
    ) -> ListOutcome<R>
    where
        R: DeserializeOwned + Send,
        F: FnMut(usize) + Send,
    {
        let per_page = usize::from(self.per_page);
        let mut outcome = ListOutcome::new(resource);

        loop {
            let page = outcome.pages + 1;
            let page_request = request
                .clone()
                .query("page", page)
                .query("per_page", per_page);

            match self.execute_json::<Vec<R>>(page_request).await {
                Ok(items) => {
                    let len = items.len();
                    outcome.items.extend(items);
                    outcome.pages = page;
                    on_page(len);
                    if policy.is_last_page(len, per_page) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(resource, page, error = %e, "listing failed, keeping partial result");
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        debug!(
            resource,
            pages = outcome.pages,
            items = outcome.items.len(),
            complete = outcome.is_complete(),
            "listing finished"
        );
        outcome
    }

    /// Fetches every issue assigned to the user, in any state, sorted by
    /// title.
    pub async fn fetch_assigned_issues(&self) -> ListOutcome<Issue> {
        self.fetch_assigned_issues_with_progress(|_| {}).await
    }

    /// Like [`fetch_assigned_issues`](Self::fetch_assigned_issues), calling
    /// `progress` with the number of issues received on each page.
    #[instrument(skip_all)]
    pub async fn fetch_assigned_issues_with_progress<F>(&self, progress: F) -> ListOutcome<Issue>
    where
        F: FnMut(usize) + Send,
    {
        let request = match self.endpoint(&["user", "issues"]) {
            Ok(url) => ApiRequest::get(url)
                .query("filter", "assigned")
                .query("state", "all"),
            Err(e) => return failed("issues", e),
        };

        let mut outcome = self
            .fetch_all("issues", request, PagePolicy::ShortPage, progress)
            .await;
        sort_by_title(&mut outcome.items);
        outcome
    }

    /// Fetches every gist owned by the user.
    ///
    /// Gist listings are only known to be exhausted on an empty page.
    #[instrument(skip_all)]
    pub async fn fetch_gists(&self) -> ListOutcome<Gist> {
        let request = match self.endpoint(&["gists"]) {
            Ok(url) => ApiRequest::get(url).query(CACHE_BUST_PARAM, cache_buster()),
            Err(e) => return failed("gists", e),
        };
        self.fetch_all("gists", request, PagePolicy::EmptyPage, |_| {})
            .await
    }

    /// Fetches every comment on an issue.
    #[instrument(skip_all, fields(issue = issue.id))]
    pub async fn fetch_issue_comments(&self, issue: &Issue) -> ListOutcome<Comment> {
        let request = match self.comments_url(issue) {
            Ok(url) => ApiRequest::get(url),
            Err(e) => return failed("comments", e),
        };
        self.fetch_all("comments", request, PagePolicy::ShortPage, |_| {})
            .await
    }

    /// Fetches a single gist, including inline file contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the gist does not exist or the call fails.
    #[instrument(skip(self))]
    pub async fn get_gist(&self, id: &str) -> Result<Gist> {
        let request = ApiRequest::get(self.endpoint(&["gists", id])?);
        self.execute_json(request).await
    }

    /// Creates a gist and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip_all, fields(description = %gist.description))]
    pub async fn create_gist(&self, gist: &GistPayload) -> Result<String> {
        let request = ApiRequest::post(self.endpoint(&["gists"])?, to_body(gist)?);
        let created: Gist = self.execute_json(request).await?;
        debug!(id = %created.id, "created gist");
        Ok(created.id)
    }

    /// Replaces the files of an existing gist.
    ///
    /// # Errors
    ///
    /// Returns an error if the gist does not exist or the call fails.
    #[instrument(skip(self, gist))]
    pub async fn update_gist(&self, id: &str, gist: &GistPayload) -> Result<()> {
        let request = ApiRequest::patch(self.endpoint(&["gists", id])?, to_body(gist)?);
        self.execute(request).await.map(|_| ())
    }

    /// Fetches raw content, such as a gist file's `raw_url`, bypassing HTTP
    /// caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn fetch_raw(&self, url: &str) -> Result<String> {
        let request = ApiRequest::get(url).query(CACHE_BUST_PARAM, cache_buster());
        Ok(self.execute(request).await?.body)
    }

    /// Posts a comment on an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue has no repository or the call fails.
    #[instrument(skip(self, issue, body), fields(issue = issue.id))]
    pub async fn post_comment(&self, issue: &Issue, body: &str) -> Result<Comment> {
        let request = ApiRequest::post(
            self.comments_url(issue)?,
            serde_json::json!({ "body": body }),
        );
        let comment: Comment = self.execute_json(request).await?;
        debug!(comment = comment.id, "posted comment");
        Ok(comment)
    }

    fn comments_url(&self, issue: &Issue) -> Result<String> {
        let (Some(owner), Some(repo)) = (issue.owner(), issue.repo()) else {
            return Err(Error::MissingRepository { issue_id: issue.id });
        };
        let number = issue.number.to_string();
        self.endpoint(&["repos", owner, repo, "issues", &number, "comments"])
    }
}

/// Builds GitHub clients for a token.
///
/// The session controller creates a fresh client on every login through
/// this trait.
pub trait Connector: Send + Sync {
    /// The transport of the clients built.
    type Transport: Transport + 'static;

    /// Builds a client for `token`, reporting to `monitor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be initialized.
    fn connect(
        &self,
        token: &SecretString,
        monitor: RateLimitMonitor,
    ) -> Result<GitHubClient<Self::Transport>>;
}

/// Builds octocrab-backed clients.
#[derive(Debug, Clone)]
pub struct OctocrabConnector {
    api_base: String,
    per_page: u8,
}

impl Default for OctocrabConnector {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_PER_PAGE)
    }
}

impl OctocrabConnector {
    /// Creates a connector for the given API root and page size.
    #[must_use]
    pub fn new(api_base: impl Into<String>, per_page: u8) -> Self {
        Self {
            api_base: api_base.into(),
            per_page,
        }
    }
}

impl Connector for OctocrabConnector {
    type Transport = OctocrabTransport;

    fn connect(
        &self,
        token: &SecretString,
        monitor: RateLimitMonitor,
    ) -> Result<GitHubClient<OctocrabTransport>> {
        let token = SecretString::from(token.expose_secret().to_string());
        Ok(GitHubClient::new(Some(token))?
            .with_monitor(monitor)
            .with_api_base(self.api_base.clone())
            .with_per_page(self.per_page))
    }
}

/// Maps an unsuccessful response to an error.
fn status_error(url: &str, response: &ApiResponse) -> Error {
    let exhausted = response
        .headers
        .get(REMAINING_HEADER)
        .is_some_and(|remaining| remaining.trim() == "0");
    if matches!(response.status, 403 | 429) && exhausted {
        let reset_after = RateLimitRecord::from_headers(&response.headers)
            .map(|record| record.reset_after(Utc::now()));
        return Error::RateLimited { reset_after };
    }

    let message = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| response.body.trim().to_string());

    Error::Http {
        status: response.status,
        url: url.to_string(),
        message,
    }
}

fn failed<R>(resource: &'static str, error: Error) -> ListOutcome<R> {
    warn!(resource, error = %error, "listing could not start");
    let mut outcome = ListOutcome::new(resource);
    outcome.error = Some(error);
    outcome
}

fn to_body(payload: &impl Serialize) -> Result<serde_json::Value> {
    serde_json::to_value(payload).map_err(Error::Encode)
}

fn cache_buster() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use ghtt_protocol::dummy::dummy_user;

    use super::*;
    use crate::fake::{FAKE_API_BASE, FakeGitHub, Fault};
    use crate::models::FileContent;
    use crate::transport::Method;

    fn issues(count: u64) -> Vec<Issue> {
        (0..count)
            .map(|n| Issue::new(n, n, format!("issue {n:03}"), "octocat", "tracker"))
            .collect()
    }

    fn payload(content: &str) -> GistPayload {
        GistPayload {
            description: "GHTT-state".to_string(),
            public: false,
            files: [(
                "GHTT-state".to_string(),
                FileContent {
                    content: content.to_string(),
                },
            )]
            .into(),
        }
    }

    #[tokio::test]
    async fn new_unauthenticated_client() {
        let client = GitHubClient::new(None).unwrap();
        assert!(!client.is_authenticated());

        let empty = SecretString::from(String::new());
        let client = GitHubClient::new(Some(empty)).unwrap();
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn new_authenticated_client() {
        let token = SecretString::from("fake_token_for_testing".to_string());
        let client = GitHubClient::new(Some(token)).unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.per_page(), 30);
    }

    #[tokio::test]
    async fn validate_token_unauthenticated() {
        let client = GitHubClient::new(None).unwrap();
        assert!(!client.validate_token().await.unwrap());
    }

    #[test]
    fn endpoint_encodes_segments() {
        let github = FakeGitHub::new();
        let client = github.client();
        assert_eq!(
            client.endpoint(&["gists", "a/b c"]).unwrap(),
            format!("{FAKE_API_BASE}/gists/a%2Fb%20c")
        );

        let enterprise = github.client().with_api_base("https://ghe.example.com/api/v3");
        assert_eq!(
            enterprise.endpoint(&["user"]).unwrap(),
            "https://ghe.example.com/api/v3/user"
        );
    }

    #[tokio::test]
    async fn get_user_returns_profile() {
        let github = FakeGitHub::new();
        let user = github.client().get_user().await.unwrap();
        assert_eq!(user, dummy_user());
    }

    #[tokio::test]
    async fn get_user_with_bad_token_fails_validation() {
        let github = FakeGitHub::new();
        let client = github.client_with_token("wrong-token");
        let err = client.get_user().await.unwrap_err();
        assert!(matches!(err, Error::TokenValidation { reason } if reason == "Bad credentials"));
        assert!(client.validate_token().await.is_err());
    }

    #[tokio::test]
    async fn short_final_page_ends_issue_listing() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(issues(59));

        let outcome = github.client().fetch_assigned_issues().await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.items.len(), 59);
        assert_eq!(outcome.pages, 2);
        assert_eq!(github.count(Method::Get, "/user/issues"), 2);
    }

    #[tokio::test]
    async fn empty_first_page_yields_empty_listing() {
        let github = FakeGitHub::new();
        let outcome = github.client().fetch_assigned_issues().await;
        assert!(outcome.is_complete());
        assert!(outcome.items.is_empty());
        assert_eq!(github.count(Method::Get, "/user/issues"), 1);
    }

    #[tokio::test]
    async fn full_last_page_needs_one_more_request() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(issues(60));

        let outcome = github.client().fetch_assigned_issues().await;
        assert_eq!(outcome.items.len(), 60);
        assert_eq!(github.count(Method::Get, "/user/issues"), 3);
    }

    #[tokio::test]
    async fn issue_listing_sends_filters_and_page_size() {
        let github = FakeGitHub::new();
        github.client().with_per_page(10).fetch_assigned_issues().await;

        let request = &github.requests()[0];
        assert_eq!(request.query_param("filter"), Some("assigned"));
        assert_eq!(request.query_param("state"), Some("all"));
        assert_eq!(request.query_param("page"), Some("1"));
        assert_eq!(request.query_param("per_page"), Some("10"));
    }

    #[tokio::test]
    async fn issues_are_sorted_by_title() {
        let github = FakeGitHub::new();
        github.add_assigned_issues([
            Issue::new(1, 1, "zulu", "o", "r"),
            Issue::new(2, 2, "Alpha", "o", "r"),
            Issue::new(3, 3, "mike", "o", "r"),
        ]);

        let titles: Vec<_> = github
            .client()
            .fetch_assigned_issues()
            .await
            .into_items()
            .into_iter()
            .map(|issue| issue.title)
            .collect();
        assert_eq!(titles, ["Alpha", "mike", "zulu"]);
    }

    #[tokio::test]
    async fn progress_reports_every_page() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(issues(35));

        let mut pages = Vec::new();
        github
            .client()
            .fetch_assigned_issues_with_progress(|len| pages.push(len))
            .await;
        assert_eq!(pages, [30, 5]);
    }

    #[tokio::test]
    async fn failed_page_keeps_partial_result() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(issues(45));
        github.fail_nth(Method::Get, "/user/issues", 1, Fault::Status(502));

        let outcome = github.client().fetch_assigned_issues().await;
        assert!(!outcome.is_complete());
        assert_eq!(outcome.items.len(), 30);
        assert_eq!(outcome.pages, 1);
        assert!(matches!(outcome.error, Some(Error::Http { status: 502, .. })));
    }

    #[tokio::test]
    async fn transport_failure_yields_empty_incomplete_listing() {
        let github = FakeGitHub::new();
        github.add_assigned_issues(issues(3));
        github.fail(Method::Get, "/user/issues", Fault::Transport);

        let outcome = github.client().fetch_assigned_issues().await;
        assert!(outcome.items.is_empty());
        assert!(matches!(
            outcome.into_result(),
            Err(Error::IncompleteListing { resource: "issues", pages: 0, .. })
        ));
    }

    #[tokio::test]
    async fn gist_listing_stops_on_empty_page_only() {
        let github = FakeGitHub::new();
        for n in 0..3 {
            github.insert_gist(Some(&format!("gist {n}")), [("a.txt", "a")]);
        }

        let outcome = github.client().fetch_gists().await;
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.pages, 2);

        let requests = github.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].query_param(CACHE_BUST_PARAM).is_some());
    }

    #[tokio::test]
    async fn every_response_feeds_the_monitor() {
        let github = FakeGitHub::new();
        let client = github.client();
        assert!(client.monitor().get("core").is_none());

        client.get_user().await.unwrap();
        client.get_user().await.unwrap();
        assert_eq!(client.monitor().get("core").unwrap().used, 2);
    }

    #[tokio::test]
    async fn error_responses_feed_the_monitor_too() {
        let github = FakeGitHub::new();
        let client = github.client_with_token("wrong-token");
        let _ = client.get_user().await;
        assert!(client.monitor().get("core").is_some());
    }

    #[tokio::test]
    async fn exhausted_quota_maps_to_rate_limited() {
        let github = FakeGitHub::new();
        github.fail(Method::Get, "/user", Fault::RateLimited);

        let client = github.client();
        let err = client.get_user().await.unwrap_err();
        assert!(matches!(err, Error::RateLimited { reset_after: Some(_) }));
        assert!(client.monitor().is_critical());
    }

    #[tokio::test]
    async fn create_update_and_fetch_gist() {
        let github = FakeGitHub::new();
        let client = github.client();

        let id = client.create_gist(&payload("one")).await.unwrap();
        client.update_gist(&id, &payload("two")).await.unwrap();

        let gist = client.get_gist(&id).await.unwrap();
        assert_eq!(gist.description.as_deref(), Some("GHTT-state"));
        assert!(!gist.public);
        assert_eq!(gist.files["GHTT-state"].full_content(), Some("two"));

        let raw_url = gist.files["GHTT-state"].raw_url.clone().unwrap();
        assert_eq!(client.fetch_raw(&raw_url).await.unwrap(), "two");
        let raw_request = github.requests().pop().unwrap();
        assert!(raw_request.query_param(CACHE_BUST_PARAM).is_some());
    }

    #[tokio::test]
    async fn update_missing_gist_is_not_found() {
        let github = FakeGitHub::new();
        let err = github
            .client()
            .update_gist("nope", &payload("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn post_and_list_comments() {
        let github = FakeGitHub::new();
        let client = github.client();
        let issue = Issue::new(1, 7, "t", "octocat", "tracker");

        for n in 0..31 {
            client.post_comment(&issue, &format!("comment {n}")).await.unwrap();
        }

        let outcome = client.fetch_issue_comments(&issue).await;
        assert!(outcome.is_complete());
        assert_eq!(outcome.items.len(), 31);
        assert_eq!(outcome.items[0].body.as_deref(), Some("comment 0"));
        assert_eq!(outcome.items[0].user.as_ref().unwrap().login, "octocat");
    }

    #[tokio::test]
    async fn comments_need_a_repository() {
        let github = FakeGitHub::new();
        let mut issue = Issue::new(9, 1, "t", "o", "r");
        issue.repository = None;

        let err = github.client().post_comment(&issue, "x").await.unwrap_err();
        assert!(matches!(err, Error::MissingRepository { issue_id: 9 }));
        assert!(!github.client().fetch_issue_comments(&issue).await.is_complete());
        assert!(github.requests().is_empty());
    }
}
