use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_HOST: &str = "https://api.skiff.dev";
pub const HOST_ENV: &str = "SKIFF_HOST";
pub const API_VERSION: &str = "2";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    host: Url,
    credentials: Option<Credentials>,
    user_agent: String,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(host: impl AsRef<str>) -> Result<Self, ClientError> {
        let mut base = host.as_ref().trim().to_string();
        if base.is_empty() {
            return Err(ClientError::InvalidConfig(
                "platform host cannot be empty".into(),
            ));
        }
        if !base.contains("://") {
            base = format!("{}{base}", infer_scheme(&base));
        }
        let mut host = Url::parse(&base)
            .map_err(|err| ClientError::InvalidConfig(format!("invalid platform host: {err}")))?;
        if host.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "platform host {host} cannot carry request paths"
            )));
        }
        // Relative request paths join under the host's own path prefix.
        if !host.path().ends_with('/') {
            let prefixed = format!("{}/", host.path());
            host.set_path(&prefixed);
        }
        Ok(Self {
            host,
            credentials: None,
            user_agent: concat!("skiff-client/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    /// Builds a config for `default_host`, letting `SKIFF_HOST` override it.
    pub fn from_env(default_host: impl AsRef<str>) -> Result<Self, ClientError> {
        let host = std::env::var(HOST_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default_host.as_ref().to_string());
        Self::new(host)
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// `None` disables the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

fn infer_scheme(host: &str) -> &'static str {
    let name = host
        .split(['/', ':'])
        .next()
        .unwrap_or(host)
        .to_ascii_lowercase();
    let local = name == "localhost"
        || name.ends_with(".localhost")
        || name == "0.0.0.0"
        || name.starts_with("127.")
        || name.starts_with("10.")
        || name.starts_with("192.168.")
        || host.starts_with("[::1]");
    if local {
        "http://"
    } else {
        "https://"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn bare_public_hosts_use_https() {
        let config = ClientConfig::new("api.skiff.dev").unwrap();
        assert_eq!(config.host().as_str(), "https://api.skiff.dev/");
    }

    #[test]
    fn bare_local_hosts_use_http() {
        for host in ["localhost:5000", "127.0.0.1", "10.1.2.3:80", "[::1]:8080"] {
            let config = ClientConfig::new(host).unwrap();
            assert_eq!(config.host().scheme(), "http", "host {host}");
        }
    }

    #[test]
    fn explicit_scheme_is_kept() {
        let config = ClientConfig::new("http://api.skiff.dev").unwrap();
        assert_eq!(config.host().scheme(), "http");
    }

    #[test]
    fn host_path_prefix_gets_trailing_slash() {
        let config = ClientConfig::new("https://gateway.example.com/platform").unwrap();
        assert_eq!(config.host().as_str(), "https://gateway.example.com/platform/");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(
            ClientConfig::new("  "),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn credentials_debug_hides_api_key() {
        let rendered = format!("{:?}", Credentials::new("me@example.com", "secret"));
        assert!(rendered.contains("me@example.com"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn env_override_wins_over_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let original = std::env::var(HOST_ENV).ok();

        std::env::set_var(HOST_ENV, "localhost:5001");
        let config = ClientConfig::from_env(DEFAULT_HOST).unwrap();
        assert_eq!(config.host().as_str(), "http://localhost:5001/");

        std::env::remove_var(HOST_ENV);
        let config = ClientConfig::from_env(DEFAULT_HOST).unwrap();
        assert_eq!(config.host().as_str(), "https://api.skiff.dev/");

        if let Some(value) = original {
            std::env::set_var(HOST_ENV, value);
        }
    }
}
