use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::{ClientError, ClientResult};
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub upid: String,
    pub process: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Seconds since the last state change.
    #[serde(default)]
    pub elapsed: Option<u64>,
    #[serde(default)]
    pub attached: bool,
}

impl ProcessInfo {
    /// Process type, e.g. `web` for `web.1`.
    pub fn process_type(&self) -> &str {
        self.process
            .split_once('.')
            .map(|(kind, _)| kind)
            .unwrap_or(&self.process)
    }
}

/// Which processes a restart applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessSelector {
    #[default]
    All,
    Type(String),
    Process(String),
}

impl Client {
    pub async fn ps(&self, app: &str) -> ClientResult<Vec<ProcessInfo>> {
        self.get_json(format!("/apps/{}/ps", segment(app))).await
    }

    /// Restarts the whole application.
    pub async fn restart(&self, app: &str) -> ClientResult<()> {
        self.delete(format!("/apps/{}/server", segment(app))).await?;
        Ok(())
    }

    pub async fn ps_restart(&self, app: &str, selector: ProcessSelector) -> ClientResult<()> {
        let payload = match selector {
            ProcessSelector::All => Payload::Empty,
            ProcessSelector::Type(kind) => Payload::form([("type", kind)]),
            ProcessSelector::Process(name) => Payload::form([("ps", name)]),
        };
        self.post(format!("/apps/{}/ps/restart", segment(app)), payload)
            .await?;
        Ok(())
    }

    /// Sets the number of `process_type` processes; returns the new count.
    pub async fn ps_scale(&self, app: &str, process_type: &str, quantity: u32) -> ClientResult<u32> {
        let response = self
            .post(
                format!("/apps/{}/ps/scale", segment(app)),
                Payload::form([("type", process_type.to_string()), ("qty", quantity.to_string())]),
            )
            .await?;
        parse_count(&response.body)
    }

    pub async fn set_dynos(&self, app: &str, quantity: u32) -> ClientResult<u32> {
        let response = self
            .put(
                format!("/apps/{}/dynos", segment(app)),
                Payload::form([("dynos", quantity.to_string())]),
            )
            .await?;
        parse_count(&response.body)
    }

    pub async fn set_workers(&self, app: &str, quantity: u32) -> ClientResult<u32> {
        let response = self
            .put(
                format!("/apps/{}/workers", segment(app)),
                Payload::form([("workers", quantity.to_string())]),
            )
            .await?;
        parse_count(&response.body)
    }
}

fn parse_count(body: &str) -> ClientResult<u32> {
    body.trim()
        .parse()
        .map_err(|_| ClientError::InvalidResponse(format!("expected a process count, got {body:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;
    use reqwest::Method;

    #[test_timeout::tokio_timeout_test]
    async fn lists_processes() {
        let transport = ScriptedTransport::new();
        transport.ok(
            r#"[{"upid":"1","process":"web.1","state":"up","elapsed":120},
                {"upid":"2","process":"run.3","command":"bash","attached":true}]"#,
        );

        let processes = transport.client().ps("demo").await.unwrap();

        assert_eq!(processes[0].process_type(), "web");
        assert_eq!(processes[0].elapsed, Some(120));
        assert!(processes[1].attached);
        assert_eq!(processes[1].command.as_deref(), Some("bash"));
    }

    #[test_timeout::tokio_timeout_test]
    async fn scale_parses_new_quantity() {
        let transport = ScriptedTransport::new();
        transport.ok("3\n");

        let quantity = transport.client().ps_scale("demo", "worker", 3).await.unwrap();

        assert_eq!(quantity, 3);
        assert_eq!(
            transport.last_request().payload,
            Payload::form([("type", "worker"), ("qty", "3")])
        );
    }

    #[test_timeout::tokio_timeout_test]
    async fn unparseable_counts_are_rejected() {
        let transport = ScriptedTransport::new();
        transport.ok("lots");

        let err = transport.client().set_dynos("demo", 2).await.unwrap_err();

        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[test_timeout::tokio_timeout_test]
    async fn restarts_by_selector() {
        let transport = ScriptedTransport::new();
        for _ in 0..4 {
            transport.ok("");
        }
        let client = transport.client();

        client.restart("demo").await.unwrap();
        client.ps_restart("demo", ProcessSelector::All).await.unwrap();
        client
            .ps_restart("demo", ProcessSelector::Type("web".into()))
            .await
            .unwrap();
        client
            .ps_restart("demo", ProcessSelector::Process("web.2".into()))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(requests[0].url.path(), "/apps/demo/server");
        assert_eq!(requests[1].payload, Payload::Empty);
        assert_eq!(requests[2].payload, Payload::form([("type", "web")]));
        assert_eq!(requests[3].payload, Payload::form([("ps", "web.2")]));
        assert_eq!(requests[3].url.path(), "/apps/demo/ps/restart");
    }

    #[test_timeout::tokio_timeout_test]
    async fn legacy_dyno_and_worker_counts() {
        let transport = ScriptedTransport::new();
        transport.ok("4");
        transport.ok("1");
        let client = transport.client();

        assert_eq!(client.set_dynos("demo", 4).await.unwrap(), 4);
        assert_eq!(client.set_workers("demo", 1).await.unwrap(), 1);
        assert_eq!(transport.last_request().url.path(), "/apps/demo/workers");
    }
}
