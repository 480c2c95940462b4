use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::transport::{Payload, ReqwestTransport, Request, Response, Target, Transport};
use crate::warnings::{WarningHandler, WarningTracker};

/// Handle to the platform API. Cheap to clone; clones share the transport and
/// the warning history.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    warnings: WarningTracker,
}

impl Client {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.clone())?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                warnings: WarningTracker::default(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Registers the callback for platform warnings. Each distinct warning is
    /// delivered once for the lifetime of this client.
    pub fn on_warning<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let handler: WarningHandler = Arc::new(handler);
        self.inner.warnings.set_handler(handler);
    }

    pub async fn request(&self, request: Request) -> ClientResult<Response> {
        let response = self.inner.transport.request(request).await?;
        if let Some(warning) = response.warning() {
            self.inner.warnings.observe(warning);
        }
        Ok(response)
    }

    pub async fn get(&self, target: impl Into<Target>) -> ClientResult<Response> {
        self.request(Request::new(Method::GET, target)).await
    }

    pub async fn post(&self, target: impl Into<Target>, payload: Payload) -> ClientResult<Response> {
        self.request(Request::new(Method::POST, target).with_payload(payload))
            .await
    }

    pub async fn put(&self, target: impl Into<Target>, payload: Payload) -> ClientResult<Response> {
        self.request(Request::new(Method::PUT, target).with_payload(payload))
            .await
    }

    pub async fn delete(&self, target: impl Into<Target>) -> ClientResult<Response> {
        self.request(Request::new(Method::DELETE, target)).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        target: impl Into<Target>,
    ) -> ClientResult<T> {
        self.get(target).await?.json()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.inner.config.host().as_str())
            .finish()
    }
}

/// Percent-encodes one path segment taken from user input.
pub(crate) fn segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;
    use crate::transport::WARNING_HEADER;
    use parking_lot::Mutex;
    use reqwest::StatusCode;

    #[test_timeout::tokio_timeout_test]
    async fn warning_callback_fires_once_per_distinct_message() {
        let transport = ScriptedTransport::new();
        for warning in ["slug is large", "slug is large", "slug is large", "stack sunset"] {
            transport.respond(
                Response::new(StatusCode::OK, "[]").with_header(WARNING_HEADER, warning),
            );
        }
        let client = transport.client();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.on_warning(move |warning| sink.lock().push(warning.to_string()));

        for _ in 0..4 {
            client.get("/apps").await.unwrap();
        }

        assert_eq!(seen.lock().as_slice(), ["slug is large", "stack sunset"]);
    }

    #[test_timeout::tokio_timeout_test]
    async fn clones_share_warning_history() {
        let transport = ScriptedTransport::new();
        transport.respond(Response::new(StatusCode::OK, "").with_header(WARNING_HEADER, "w"));
        transport.respond(Response::new(StatusCode::OK, "").with_header(WARNING_HEADER, "w"));
        let client = transport.client();
        let count = Arc::new(Mutex::new(0));
        let counter = count.clone();
        client.on_warning(move |_| *counter.lock() += 1);

        client.get("/a").await.unwrap();
        client.clone().get("/b").await.unwrap();

        assert_eq!(*count.lock(), 1);
    }

    #[test_timeout::tokio_timeout_test]
    async fn failures_propagate_unchanged() {
        let transport = ScriptedTransport::new();
        transport.fail(StatusCode::FORBIDDEN, "not a collaborator");
        let client = transport.client();

        let err = client.get("/apps/demo").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn segments_are_percent_encoded() {
        assert_eq!(segment("ops@example.com"), "ops%40example.com");
        assert_eq!(segment("ssh-rsa AAA user"), "ssh-rsa%20AAA%20user");
        assert_eq!(segment("a/b"), "a%2Fb");
    }
}
