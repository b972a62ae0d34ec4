//! The HTTP seam between the API client and the network.
//!
//! [`GitHubClient`](crate::GitHubClient) describes each call as an
//! [`ApiRequest`] and hands it to a [`Transport`]. The production transport,
//! [`OctocrabTransport`], sends it through octocrab; tests substitute an
//! in-memory implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
}

/// A request to the GitHub API (or to a gist raw URL).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// The HTTP method.
    pub method: Method,
    /// Absolute URL, without query string.
    pub url: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// JSON body, for `POST` and `PATCH`.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Creates a `POST` request with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Creates a `PATCH` request with a JSON body.
    #[must_use]
    pub fn patch(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Patch,
            body: Some(body),
            ..Self::get(url)
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Returns the value of the first query parameter with the given name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the absolute URL including the encoded query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the URL does not parse.
    pub fn full_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// Response headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    /// Builds a header set from name/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
                .collect(),
        )
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Sets a header, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }
}

/// A response as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: ResponseHeaders,
    /// Raw response body.
    pub body: String,
}

impl ApiResponse {
    /// Returns whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Sends API requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    ///
    /// Implementations only fail when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Transport backed by an octocrab client.
#[derive(Debug, Clone)]
pub struct OctocrabTransport {
    inner: Octocrab,
}

impl OctocrabTransport {
    /// Creates a transport, authenticated when a token is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the octocrab client fails to initialize.
    #[instrument(skip(token), fields(authenticated = token.is_some()))]
    pub fn new(token: Option<&SecretString>) -> Result<Self> {
        let builder = Octocrab::builder();
        let inner = match token {
            Some(token) => {
                debug!("creating authenticated GitHub transport");
                builder.personal_token(token.expose_secret()).build()?
            }
            None => {
                debug!("creating unauthenticated GitHub transport");
                builder.build()?
            }
        };
        Ok(Self { inner })
    }

    /// Returns a reference to the underlying octocrab client.
    #[must_use]
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }
}

#[async_trait]
impl Transport for OctocrabTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = request.full_url()?;
        let response = match request.method {
            Method::Get => self.inner._get(url.as_str()).await?,
            Method::Post => self.inner._post(url.as_str(), request.body.as_ref()).await?,
            Method::Patch => {
                self.inner
                    ._patch(url.as_str(), request.body.as_ref())
                    .await?
            }
        };

        let status = response.status().as_u16();
        let headers = ResponseHeaders::from_pairs(
            response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        );
        let body = self.inner.body_to_string(response).await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_encodes_query() {
        let request = ApiRequest::get("https://api.github.com/user/issues")
            .query("filter", "assigned")
            .query("page", 2)
            .query("label", "a b&c");
        assert_eq!(
            request.full_url().unwrap().as_str(),
            "https://api.github.com/user/issues?filter=assigned&page=2&label=a+b%26c"
        );
    }

    #[test]
    fn full_url_without_query_has_no_question_mark() {
        let request = ApiRequest::get("https://api.github.com/user");
        assert_eq!(request.full_url().unwrap().as_str(), "https://api.github.com/user");
    }

    #[test]
    fn full_url_rejects_relative_urls() {
        let request = ApiRequest::get("/user");
        assert!(matches!(request.full_url(), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn query_param_returns_first_match() {
        let request = ApiRequest::get("https://x.test").query("page", 1).query("page", 2);
        assert_eq!(request.query_param("page"), Some("1"));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn response_headers_are_case_insensitive() {
        let mut headers = ResponseHeaders::from_pairs([("ETag", "abc")]);
        assert_eq!(headers.get("etag"), Some("abc"));
        headers.insert("ETAG", "def");
        assert_eq!(headers.get("ETag"), Some("def"));
    }

    #[test]
    fn response_json_reports_decode_errors() {
        let response = ApiResponse {
            status: 200,
            headers: ResponseHeaders::default(),
            body: "[1, 2".to_string(),
        };
        assert!(response.is_success());
        let result: Result<Vec<u8>> = response.json("https://x.test");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[tokio::test]
    async fn octocrab_transport_builds_with_and_without_token() {
        let token = SecretString::from("fake_token_for_testing".to_string());
        assert!(OctocrabTransport::new(Some(&token)).is_ok());
        assert!(OctocrabTransport::new(None).is_ok());
    }
}
