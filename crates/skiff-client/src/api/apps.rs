use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::{ClientError, ClientResult};
use crate::transport::Payload;

const CREATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub git_url: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub dynos: Option<u32>,
    #[serde(default)]
    pub workers: Option<u32>,
    #[serde(default)]
    pub repo_size: Option<u64>,
    #[serde(default)]
    pub slug_size: Option<u64>,
    #[serde(default)]
    pub create_status: Option<String>,
}

/// Options for [`Client::create_app`]; a missing name lets the platform pick one.
#[derive(Debug, Clone, Default)]
pub struct NewApp {
    pub name: Option<String>,
    pub stack: Option<String>,
}

impl Client {
    pub async fn list_apps(&self) -> ClientResult<Vec<App>> {
        self.get_json("/apps").await
    }

    pub async fn app_info(&self, app: &str) -> ClientResult<App> {
        self.get_json(format!("/apps/{}", segment(app))).await
    }

    pub async fn create_app(&self, options: NewApp) -> ClientResult<App> {
        let mut fields = Vec::new();
        if let Some(name) = options.name {
            fields.push(("app[name]", name));
        }
        if let Some(stack) = options.stack {
            fields.push(("app[stack]", stack));
        }
        let app: App = self.post("/apps", Payload::form(fields)).await?.json()?;
        tracing::info!(target: "skiff::apps", app = %app.name, "app created");
        Ok(app)
    }

    /// `true` once the platform finished provisioning `app`.
    pub async fn create_complete(&self, app: &str) -> ClientResult<bool> {
        let response = self.get(format!("/apps/{}/status", segment(app))).await?;
        match response.status {
            StatusCode::CREATED => Ok(true),
            StatusCode::ACCEPTED => Ok(false),
            other => Err(ClientError::InvalidResponse(format!(
                "unexpected create status {other} for {app}"
            ))),
        }
    }

    pub async fn wait_until_created(&self, app: &str) -> ClientResult<()> {
        while !self.create_complete(app).await? {
            tokio::time::sleep(CREATE_POLL_INTERVAL).await;
        }
        Ok(())
    }

    pub async fn rename_app(&self, app: &str, new_name: &str) -> ClientResult<()> {
        self.put(
            format!("/apps/{}", segment(app)),
            Payload::form([("app[name]", new_name)]),
        )
        .await?;
        Ok(())
    }

    pub async fn destroy_app(&self, app: &str) -> ClientResult<()> {
        self.delete(format!("/apps/{}", segment(app))).await?;
        tracing::info!(target: "skiff::apps", app, "app destroyed");
        Ok(())
    }

    pub async fn set_maintenance(&self, app: &str, enabled: bool) -> ClientResult<()> {
        let mode = if enabled { "1" } else { "0" };
        self.post(
            format!("/apps/{}/server/maintenance", segment(app)),
            Payload::form([("maintenance_mode", mode)]),
        )
        .await?;
        Ok(())
    }
}
