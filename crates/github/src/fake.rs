//! An in-memory GitHub for tests.
//!
//! [`FakeGitHub`] implements [`Transport`] and [`Connector`] over shared
//! state, so a test can hand clients to the code under test and inspect or
//! mutate the same "server" afterwards. It serves the endpoints ghtt uses:
//!
//! - `GET /user`
//! - `GET /user/issues` (paginated)
//! - `GET /gists` (paginated), `GET /gists/{id}`, `POST /gists`,
//!   `PATCH /gists/{id}`
//! - raw gist file URLs
//! - `GET`/`POST /repos/{owner}/{repo}/issues/{number}/comments`
//!
//! API responses carry rate-limit headers for the `core` resource, each
//! request using one unit of quota. Every request is recorded, and faults
//! can be injected per method and path.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use ghtt_protocol::dummy::dummy_user;
use ghtt_protocol::{Account, Issue, UserProfile};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;

use crate::client::{Connector, GitHubClient};
use crate::error::{Error, Result};
use crate::models::{Comment, GistPayload};
use crate::pagination::DEFAULT_PER_PAGE;
use crate::ratelimit::{
    LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER, RESOURCE_HEADER, RateLimitMonitor, USED_HEADER,
};
use crate::transport::{ApiRequest, ApiResponse, Method, ResponseHeaders, Transport};

/// API root served by the fake.
pub const FAKE_API_BASE: &str = "https://api.github.test";

/// Host serving raw gist files.
pub const FAKE_RAW_BASE: &str = "https://gist.githubusercontent.test";

/// The token the fake accepts by default.
pub const FAKE_TOKEN: &str = "test-token";

/// Default `core` quota reported by the fake.
pub const FAKE_RATE_LIMIT: u64 = 5000;

/// A failure to inject into the next matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this status and a JSON error body.
    Status(u16),
    /// Fail without a response, like a dropped connection.
    Transport,
    /// Answer `403` with the quota exhausted.
    RateLimited,
}

/// A gist held by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeGist {
    /// Gist identifier.
    pub id: String,
    /// Gist description.
    pub description: Option<String>,
    /// Whether the gist is public.
    pub public: bool,
    /// File contents keyed by filename.
    pub files: BTreeMap<String, String>,
    /// Whether `GET /gists/{id}` reports its contents as truncated.
    pub truncated: bool,
}

#[derive(Debug)]
struct FaultRule {
    method: Method,
    path: String,
    skip: usize,
    fault: Fault,
}

type CommentKey = (String, String, u64);

#[derive(Debug)]
struct FakeState {
    user: UserProfile,
    tokens: Vec<String>,
    assigned: Vec<Issue>,
    gists: Vec<FakeGist>,
    comments: BTreeMap<CommentKey, Vec<Comment>>,
    faults: Vec<FaultRule>,
    requests: Vec<ApiRequest>,
    next_id: u64,
    used: u64,
    limit: u64,
    reset_at: i64,
}

/// A shared in-memory GitHub.
///
/// Clones share the same server state; each clone may present a different
/// token.
#[derive(Debug, Clone)]
pub struct FakeGitHub {
    state: Arc<Mutex<FakeState>>,
    token: Option<String>,
    per_page: u8,
}

impl Default for FakeGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGitHub {
    /// Creates a server for [`dummy_user`] accepting [`FAKE_TOKEN`].
    #[must_use]
    pub fn new() -> Self {
        let state = FakeState {
            user: dummy_user(),
            tokens: vec![FAKE_TOKEN.to_string()],
            assigned: Vec::new(),
            gists: Vec::new(),
            comments: BTreeMap::new(),
            faults: Vec::new(),
            requests: Vec::new(),
            next_id: 1,
            used: 0,
            limit: FAKE_RATE_LIMIT,
            reset_at: Utc::now().timestamp() + 3600,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            token: Some(FAKE_TOKEN.to_string()),
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Sets the page size of clients built by this fake.
    #[must_use]
    pub fn with_per_page(mut self, per_page: u8) -> Self {
        self.per_page = per_page;
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn presenting(&self, token: Option<&str>) -> Self {
        Self {
            token: token.map(str::to_string),
            ..self.clone()
        }
    }

    /// Returns a client presenting [`FAKE_TOKEN`].
    #[must_use]
    pub fn client(&self) -> GitHubClient<Self> {
        self.client_with_token(FAKE_TOKEN)
    }

    /// Returns a client presenting `token`.
    #[must_use]
    pub fn client_with_token(&self, token: &str) -> GitHubClient<Self> {
        GitHubClient::with_transport(self.presenting(Some(token)), true)
            .with_api_base(FAKE_API_BASE)
            .with_per_page(self.per_page)
    }

    /// Returns a client presenting no token.
    #[must_use]
    pub fn anonymous_client(&self) -> GitHubClient<Self> {
        GitHubClient::with_transport(self.presenting(None), false)
            .with_api_base(FAKE_API_BASE)
            .with_per_page(self.per_page)
    }

    /// Replaces the profile served by `GET /user`.
    pub fn set_user(&self, user: UserProfile) {
        self.lock().user = user;
    }

    /// Makes the server accept another token.
    pub fn accept_token(&self, token: &str) {
        self.lock().tokens.push(token.to_string());
    }

    /// Makes the server reject every token.
    pub fn revoke_tokens(&self) {
        self.lock().tokens.clear();
    }

    /// Assigns issues to the user.
    pub fn add_assigned_issues(&self, issues: impl IntoIterator<Item = Issue>) {
        self.lock().assigned.extend(issues);
    }

    /// Stores a private gist and returns its identifier.
    pub fn insert_gist<'a>(
        &self,
        description: Option<&str>,
        files: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> String {
        let mut state = self.lock();
        let id = state.allocate_gist_id();
        state.gists.push(FakeGist {
            id: id.clone(),
            description: description.map(str::to_string),
            public: false,
            files: files
                .into_iter()
                .map(|(name, content)| (name.to_string(), content.to_string()))
                .collect(),
            truncated: false,
        });
        id
    }

    /// Returns a gist by identifier.
    #[must_use]
    pub fn gist(&self, id: &str) -> Option<FakeGist> {
        self.lock().gists.iter().find(|gist| gist.id == id).cloned()
    }

    /// Returns every gist, oldest first.
    #[must_use]
    pub fn gists(&self) -> Vec<FakeGist> {
        self.lock().gists.clone()
    }

    /// Returns the content of a gist file.
    #[must_use]
    pub fn gist_content(&self, id: &str, filename: &str) -> Option<String> {
        self.gist(id)?.files.get(filename).cloned()
    }

    /// Overwrites a gist file, as another device would.
    pub fn set_gist_content(&self, id: &str, filename: &str, content: &str) {
        if let Some(gist) = self.lock().gists.iter_mut().find(|gist| gist.id == id) {
            gist.files.insert(filename.to_string(), content.to_string());
        }
    }

    /// Deletes a gist, as another device would.
    pub fn delete_gist(&self, id: &str) {
        self.lock().gists.retain(|gist| gist.id != id);
    }

    /// Changes a gist's description, as another device would.
    pub fn set_gist_description(&self, id: &str, description: Option<&str>) {
        if let Some(gist) = self.lock().gists.iter_mut().find(|gist| gist.id == id) {
            gist.description = description.map(str::to_string);
        }
    }

    /// Makes `GET /gists/{id}` report the gist's contents as truncated.
    pub fn mark_truncated(&self, id: &str) {
        if let Some(gist) = self.lock().gists.iter_mut().find(|gist| gist.id == id) {
            gist.truncated = true;
        }
    }

    /// Returns the comment bodies of an issue, oldest first.
    #[must_use]
    pub fn comments(&self, owner: &str, repo: &str, number: u64) -> Vec<String> {
        self.lock()
            .comments
            .get(&(owner.to_string(), repo.to_string(), number))
            .map(|comments| comments.iter().filter_map(|c| c.body.clone()).collect())
            .unwrap_or_default()
    }

    /// Adds a comment to an issue.
    pub fn add_comment(&self, owner: &str, repo: &str, number: u64, body: &str) {
        let mut state = self.lock();
        let comment = state.new_comment(body.to_string());
        state
            .comments
            .entry((owner.to_string(), repo.to_string(), number))
            .or_default()
            .push(comment);
    }

    /// Fails the next request matching `method` and `path`.
    ///
    /// A path matches itself and every path below it.
    pub fn fail(&self, method: Method, path: &str, fault: Fault) {
        self.fail_nth(method, path, 0, fault);
    }

    /// Fails the request matching `method` and `path` after letting `nth`
    /// matching requests through.
    pub fn fail_nth(&self, method: Method, path: &str, nth: usize, fault: Fault) {
        self.lock().faults.push(FaultRule {
            method,
            path: path.to_string(),
            skip: nth,
            fault,
        });
    }

    /// Sets the quota consumed so far and the window quota.
    pub fn set_rate_limit(&self, used: u64, limit: u64) {
        let mut state = self.lock();
        state.used = used;
        state.limit = limit;
    }

    /// Returns every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Counts the requests matching `method` and `path`.
    #[must_use]
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method)
            .filter(|request| {
                Url::parse(&request.url).is_ok_and(|url| path_matches(url.path(), path))
            })
            .count()
    }

    /// Forgets every recorded request.
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }
}

fn path_matches(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn page_of<T: Clone>(items: &[T], request: &ApiRequest) -> Vec<T> {
    let param = |name: &str, default: usize| {
        request
            .query_param(name)
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(default)
    };
    let page = param("page", 1).max(1);
    let per_page = param("per_page", usize::from(DEFAULT_PER_PAGE));
    items
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

fn raw_url(id: &str, filename: &str) -> String {
    format!("{FAKE_RAW_BASE}/octocat/{id}/raw/{filename}")
}

impl FakeGist {
    fn to_json(&self, inline: bool) -> Value {
        let files: serde_json::Map<String, Value> = self
            .files
            .iter()
            .map(|(name, content)| {
                let mut file = json!({
                    "filename": name,
                    "type": "text/plain",
                    "raw_url": raw_url(&self.id, name),
                    "size": content.len(),
                });
                if inline {
                    file["truncated"] = json!(self.truncated);
                    file["content"] = if self.truncated {
                        json!(content.chars().take(8).collect::<String>())
                    } else {
                        json!(content)
                    };
                }
                (name.clone(), file)
            })
            .collect();
        json!({
            "id": self.id,
            "description": self.description,
            "public": self.public,
            "files": files,
        })
    }
}

impl FakeState {
    fn allocate_gist_id(&mut self) -> String {
        let id = format!("{:020x}", 0xa5a3_15d6_u64 + self.next_id);
        self.next_id += 1;
        id
    }

    fn new_comment(&mut self, body: String) -> Comment {
        let id = self.next_id;
        self.next_id += 1;
        Comment {
            id,
            body: Some(body),
            user: Some(Account {
                login: self.user.login.clone(),
                extra: serde_json::Map::new(),
            }),
            created_at: Some(Utc::now()),
        }
    }

    fn take_fault(&mut self, method: Method, path: &str) -> Option<Fault> {
        let index = self
            .faults
            .iter()
            .position(|rule| rule.method == method && path_matches(path, &rule.path))?;
        let rule = &mut self.faults[index];
        if rule.skip > 0 {
            rule.skip -= 1;
            return None;
        }
        Some(self.faults.remove(index).fault)
    }

    fn api_response(&mut self, status: u16, body: &Value) -> ApiResponse {
        self.used += 1;
        let headers = ResponseHeaders::from_pairs([
            (RESOURCE_HEADER, "core".to_string()),
            (USED_HEADER, self.used.to_string()),
            (LIMIT_HEADER, self.limit.to_string()),
            (
                REMAINING_HEADER,
                self.limit.saturating_sub(self.used).to_string(),
            ),
            (RESET_HEADER, self.reset_at.to_string()),
        ]);
        ApiResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    fn error(&mut self, status: u16, message: &str) -> ApiResponse {
        self.api_response(status, &json!({ "message": message }))
    }

    fn raw(&self, url: &Url) -> ApiResponse {
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        let content = match segments.as_slice() {
            [_, id, "raw", filename] => self
                .gists
                .iter()
                .find(|gist| gist.id == *id)
                .and_then(|gist| gist.files.get(*filename)),
            _ => None,
        };
        match content {
            Some(content) => ApiResponse {
                status: 200,
                headers: ResponseHeaders::default(),
                body: content.clone(),
            },
            None => ApiResponse {
                status: 404,
                headers: ResponseHeaders::default(),
                body: "404: Not Found".to_string(),
            },
        }
    }

    fn route(&mut self, request: &ApiRequest, url: &Url) -> ApiResponse {
        let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["user"]) => {
                let user = serde_json::to_value(&self.user).unwrap_or_default();
                self.api_response(200, &user)
            }
            (Method::Get, ["user", "issues"]) => {
                let page = page_of(&self.assigned, request);
                self.api_response(200, &json!(page))
            }
            (Method::Get, ["gists"]) => {
                let listing: Vec<Value> = self
                    .gists
                    .iter()
                    .rev()
                    .map(|gist| gist.to_json(false))
                    .collect();
                let page = page_of(&listing, request);
                self.api_response(200, &json!(page))
            }
            (Method::Get, ["gists", id]) => {
                match self.gists.iter().find(|gist| gist.id == *id) {
                    Some(gist) => {
                        let body = gist.to_json(true);
                        self.api_response(200, &body)
                    }
                    None => self.error(404, "Not Found"),
                }
            }
            (Method::Post, ["gists"]) => match payload(request) {
                Some(payload) => {
                    let id = self.allocate_gist_id();
                    let gist = FakeGist {
                        id,
                        description: Some(payload.description),
                        public: payload.public,
                        files: payload
                            .files
                            .into_iter()
                            .map(|(name, file)| (name, file.content))
                            .collect(),
                        truncated: false,
                    };
                    let body = gist.to_json(true);
                    self.gists.push(gist);
                    self.api_response(201, &body)
                }
                None => self.error(422, "Validation Failed"),
            },
            (Method::Patch, ["gists", id]) => {
                let Some(payload) = payload(request) else {
                    return self.error(422, "Validation Failed");
                };
                match self.gists.iter_mut().find(|gist| gist.id == *id) {
                    Some(gist) => {
                        gist.description = Some(payload.description);
                        for (name, file) in payload.files {
                            gist.files.insert(name, file.content);
                        }
                        let body = gist.to_json(true);
                        self.api_response(200, &body)
                    }
                    None => self.error(404, "Not Found"),
                }
            }
            (method, ["repos", owner, repo, "issues", number, "comments"]) => {
                let Ok(number) = number.parse::<u64>() else {
                    return self.error(404, "Not Found");
                };
                let key = (owner.to_string(), repo.to_string(), number);
                match method {
                    Method::Get => {
                        let all = self.comments.get(&key).cloned().unwrap_or_default();
                        let page = page_of(&all, request);
                        self.api_response(200, &json!(page))
                    }
                    Method::Post => {
                        let body = request
                            .body
                            .as_ref()
                            .and_then(|body| body.get("body")?.as_str())
                            .map(str::to_string);
                        let Some(body) = body else {
                            return self.error(422, "Validation Failed");
                        };
                        let comment = self.new_comment(body);
                        let response = json!(comment);
                        self.comments.entry(key).or_default().push(comment);
                        self.api_response(201, &response)
                    }
                    Method::Patch => self.error(404, "Not Found"),
                }
            }
            _ => self.error(404, "Not Found"),
        }
    }
}

fn payload(request: &ApiRequest) -> Option<GistPayload> {
    serde_json::from_value(request.body.clone()?).ok()
}

#[async_trait]
impl Transport for FakeGitHub {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.full_url()?;
        let mut state = self.lock();
        state.requests.push(request.clone());

        if let Some(fault) = state.take_fault(request.method, url.path()) {
            return match fault {
                Fault::Transport => Err(Error::Transport("connection reset by fake".to_string())),
                Fault::Status(status) => Ok(state.error(status, "injected failure")),
                Fault::RateLimited => {
                    state.used = state.limit.saturating_sub(1);
                    Ok(state.error(403, "API rate limit exceeded"))
                }
            };
        }

        if url.as_str().starts_with(FAKE_RAW_BASE) {
            return Ok(state.raw(&url));
        }

        let authorized = self
            .token
            .as_ref()
            .is_some_and(|token| state.tokens.contains(token));
        if !authorized {
            let message = if self.token.is_some() {
                "Bad credentials"
            } else {
                "Requires authentication"
            };
            return Ok(state.error(401, message));
        }

        Ok(state.route(&request, &url))
    }
}

impl Connector for FakeGitHub {
    type Transport = FakeGitHub;

    fn connect(
        &self,
        token: &SecretString,
        monitor: RateLimitMonitor,
    ) -> Result<GitHubClient<FakeGitHub>> {
        let token = token.expose_secret();
        let client = if token.is_empty() {
            self.anonymous_client()
        } else {
            self.client_with_token(token)
        };
        Ok(client.with_monitor(monitor))
    }
}
