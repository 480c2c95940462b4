use crate::client::{segment, Client};
use crate::error::{ClientError, ClientResult};

const LEGACY_LOGS_MARKER: &str = "Use old logs";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Number of lines to fetch.
    pub num: Option<u32>,
    /// Restrict to one process, e.g. `web.1`.
    pub process: Option<String>,
    /// Restrict to one source, e.g. `app` or `router`.
    pub source: Option<String>,
}

impl LogOptions {
    fn query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("logplex", "true");
        if let Some(num) = self.num {
            query.append_pair("num", &num.to_string());
        }
        if let Some(process) = &self.process {
            query.append_pair("ps", process);
        }
        if let Some(source) = &self.source {
            query.append_pair("source", source);
        }
        query.finish()
    }
}

impl Client {
    /// Fetches recent log lines. The platform answers with a session URL that
    /// is fetched in turn; older stacks answer with a marker asking for the
    /// legacy endpoint instead.
    pub async fn logs(&self, app: &str, options: &LogOptions) -> ClientResult<String> {
        let base = format!("/apps/{}/logs", segment(app));
        let response = self.get(format!("{base}?{}", options.query())).await?;
        let location = response.body.trim();

        if location == LEGACY_LOGS_MARKER {
            tracing::debug!(target: "skiff::logs", app, "falling back to legacy log endpoint");
            return Ok(self.get(base).await?.body);
        }
        if location.is_empty() {
            return Err(ClientError::InvalidResponse(
                "log request returned no session url".into(),
            ));
        }
        Ok(self.get(location).await?.body)
    }

    pub async fn cron_logs(&self, app: &str) -> ClientResult<String> {
        Ok(self
            .get(format!("/apps/{}/cron_logs", segment(app)))
            .await?
            .body)
    }
}
