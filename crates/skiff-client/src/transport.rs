//! HTTP plumbing shared by every API call.
//!
//! [`Transport`] is the seam between the client and the network: the client
//! builds [`Request`]s, the transport performs them and hands back a buffered
//! [`Response`]. Non-success statuses are reported as
//! [`ClientError::RequestFailed`] so callers can inspect the numeric status.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, LOCATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::config::{ClientConfig, API_VERSION};
use crate::error::{ClientError, ClientResult};

pub const WARNING_HEADER: &str = "x-skiff-warning";
pub const UPID_HEADER: &str = "x-skiff-upid";
pub const API_VERSION_HEADER: &str = "x-skiff-api-version";

/// Where a request goes: a path under the configured host, or an absolute
/// server-issued URL such as a continuation location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(String),
    Url(Url),
}

impl Target {
    pub fn resolve(&self, host: &Url) -> ClientResult<Url> {
        match self {
            Target::Url(url) => Ok(url.clone()),
            Target::Path(path) => {
                let trimmed = path.trim();
                let relative = trimmed.strip_prefix('/').unwrap_or(trimmed);
                host.join(relative).map_err(|err| {
                    ClientError::InvalidConfig(format!("cannot resolve path {trimmed}: {err}"))
                })
            }
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Target::Url(url),
            _ => Target::Path(trimmed.to_string()),
        }
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Target::from(value.as_str())
    }
}

impl From<Url> for Target {
    fn from(value: Url) -> Self {
        Target::Url(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    /// Sent as `text/plain`.
    Text(String),
    Raw {
        content_type: String,
        body: String,
    },
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl Payload {
    pub fn text(body: impl Into<String>) -> Self {
        Payload::Text(body.into())
    }

    pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Payload::Form(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub target: Target,
    pub payload: Payload,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, target: impl Into<Target>) -> Self {
        Self {
            method,
            target: target.into(),
            payload: Payload::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
        self
    }

    fn header_str(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Continuation pointer for long-polled output.
    pub fn location(&self) -> Option<&str> {
        self.header_str(LOCATION)
    }

    pub fn warning(&self) -> Option<&str> {
        self.header_str(WARNING_HEADER)
    }

    pub fn upid(&self) -> Option<&str> {
        self.header_str(UPID_HEADER)
    }

    pub fn is_no_content(&self) -> bool {
        self.status == StatusCode::NO_CONTENT || self.body.is_empty()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(|err| {
            ClientError::InvalidResponse(format!("unexpected response body: {err}"))
        })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: Request) -> ClientResult<Response>;
}

/// reqwest-backed transport adding basic auth and the platform's default
/// headers to every request.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent())
            .default_headers(default_headers());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_static(API_VERSION),
    );
    headers
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: Request) -> ClientResult<Response> {
        let Request {
            method,
            target,
            payload,
            headers,
        } = request;
        let url = target.resolve(self.config.host())?;
        tracing::debug!(target: "skiff::transport", %method, %url, "sending request");

        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(credentials) = self.config.credentials() {
            builder = builder.basic_auth(&credentials.user, Some(&credentials.api_key));
        }
        builder = match payload {
            Payload::Empty => builder,
            Payload::Text(body) => builder
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body),
            Payload::Raw { content_type, body } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body),
            Payload::Json(value) => builder.json(&value),
            Payload::Form(fields) => builder.form(&fields),
        };
        if !headers.is_empty() {
            builder = builder.headers(headers);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        tracing::debug!(
            target: "skiff::transport",
            %method,
            %url,
            status = status.as_u16(),
            bytes = body.len(),
            "received response"
        );

        if !status.is_success() {
            return Err(ClientError::RequestFailed { status, body });
        }
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("host", &self.config.host().as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Url {
        Url::parse("https://api.skiff.dev/").unwrap()
    }

    #[test]
    fn absolute_urls_become_url_targets() {
        let target = Target::from("https://chunks.skiff.dev/output/abc?offset=3");
        assert!(matches!(target, Target::Url(ref url) if url.host_str() == Some("chunks.skiff.dev")));
    }

    #[test]
    fn paths_resolve_against_host() {
        let target = Target::from("/apps/demo/services");
        assert_eq!(
            target.resolve(&host()).unwrap().as_str(),
            "https://api.skiff.dev/apps/demo/services"
        );
    }

    #[test]
    fn paths_keep_host_prefix() {
        let host = Url::parse("https://gateway.example.com/platform/").unwrap();
        let target = Target::from("apps/demo?logplex=true");
        assert_eq!(
            target.resolve(&host).unwrap().as_str(),
            "https://gateway.example.com/platform/apps/demo?logplex=true"
        );
    }

    #[test]
    fn response_header_lookup_ignores_blank_values() {
        let response = Response::new(StatusCode::OK, "data")
            .with_header("location", "https://chunks.skiff.dev/2")
            .with_header(WARNING_HEADER, "  ");
        assert_eq!(response.location(), Some("https://chunks.skiff.dev/2"));
        assert_eq!(response.warning(), None);
    }

    #[test]
    fn no_content_covers_204_and_empty_bodies() {
        assert!(Response::new(StatusCode::NO_CONTENT, "").is_no_content());
        assert!(Response::new(StatusCode::OK, "").is_no_content());
        assert!(!Response::new(StatusCode::OK, "x").is_no_content());
    }
}
