use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    #[serde(default)]
    pub descr: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Client {
    pub async fn releases(&self, app: &str) -> ClientResult<Vec<Release>> {
        self.get_json(format!("/apps/{}/releases", segment(app))).await
    }

    pub async fn release(&self, app: &str, name: &str) -> ClientResult<Release> {
        self.get_json(format!("/apps/{}/releases/{}", segment(app), segment(name)))
            .await
    }

    /// Rolls back to `release`, or to the previous one when `None`. Returns
    /// the name of the release now running.
    pub async fn rollback(&self, app: &str, release: Option<&str>) -> ClientResult<String> {
        let payload = match release {
            Some(release) => Payload::form([("rollback", release)]),
            None => Payload::Empty,
        };
        let response = self
            .post(format!("/apps/{}/releases", segment(app)), payload)
            .await?;
        Ok(response.body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;

    #[test_timeout::tokio_timeout_test]
    async fn lists_and_fetches_releases() {
        let transport = ScriptedTransport::new();
        transport.ok(r#"[{"name":"v1","descr":"Initial release"},{"name":"v2","commit":"a1b2c3"}]"#);
        transport.ok(r#"{"name":"v2","user":"ops@example.com"}"#);
        let client = transport.client();

        let releases = client.releases("demo").await.unwrap();
        let release = client.release("demo", "v2").await.unwrap();

        assert_eq!(releases.len(), 2);
        assert_eq!(releases[1].commit.as_deref(), Some("a1b2c3"));
        assert_eq!(release.user.as_deref(), Some("ops@example.com"));
        assert_eq!(transport.last_request().url.path(), "/apps/demo/releases/v2");
    }

    #[test_timeout::tokio_timeout_test]
    async fn rollback_names_target_release() {
        let transport = ScriptedTransport::new();
        transport.ok("v7\n");
        transport.ok("v6");
        let client = transport.client();

        assert_eq!(client.rollback("demo", Some("v7")).await.unwrap(), "v7");
        assert_eq!(client.rollback("demo", None).await.unwrap(), "v6");

        let requests = transport.requests();
        assert_eq!(requests[0].payload, Payload::form([("rollback", "v7")]));
        assert_eq!(requests[1].payload, Payload::Empty);
    }
}
