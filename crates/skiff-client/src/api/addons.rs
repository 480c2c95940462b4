use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub beta: bool,
    #[serde(default)]
    pub configured: bool,
}

/// Platform answer to an install, upgrade or downgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonChange {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

impl Client {
    /// Every add-on the platform offers.
    pub async fn addons(&self) -> ClientResult<Vec<Addon>> {
        self.get_json("/addons").await
    }

    pub async fn installed_addons(&self, app: &str) -> ClientResult<Vec<Addon>> {
        self.get_json(format!("/apps/{}/addons", segment(app))).await
    }

    pub async fn install_addon(
        &self,
        app: &str,
        addon: &str,
        config: &BTreeMap<String, String>,
    ) -> ClientResult<AddonChange> {
        self.post(addon_path(app, addon), config_form(config))
            .await?
            .json()
    }

    pub async fn upgrade_addon(
        &self,
        app: &str,
        addon: &str,
        config: &BTreeMap<String, String>,
    ) -> ClientResult<AddonChange> {
        self.put(addon_path(app, addon), config_form(config))
            .await?
            .json()
    }

    /// Same call as an upgrade; the platform decides the direction from the plan.
    pub async fn downgrade_addon(
        &self,
        app: &str,
        addon: &str,
        config: &BTreeMap<String, String>,
    ) -> ClientResult<AddonChange> {
        self.upgrade_addon(app, addon, config).await
    }

    pub async fn uninstall_addon(&self, app: &str, addon: &str) -> ClientResult<AddonChange> {
        self.delete(addon_path(app, addon)).await?.json()
    }

    pub async fn confirm_billing(&self) -> ClientResult<()> {
        let user = self
            .config()
            .credentials()
            .map(|credentials| credentials.user.clone())
            .unwrap_or_default();
        self.put(
            format!("/user/{}/confirm_billing", segment(&user)),
            Payload::Empty,
        )
        .await?;
        Ok(())
    }
}

fn addon_path(app: &str, addon: &str) -> String {
    format!("/apps/{}/addons/{}", segment(app), segment(addon))
}

fn config_form(config: &BTreeMap<String, String>) -> Payload {
    Payload::form(
        config
            .iter()
            .map(|(key, value)| (format!("config[{key}]"), value.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};
    use crate::mock::{ScriptedTransport, TEST_HOST};
    use reqwest::Method;
    use std::sync::Arc;

    #[test_timeout::tokio_timeout_test]
    async fn install_posts_config_fields() {
        let transport = ScriptedTransport::new();
        transport.ok(r#"{"status":"Installed","price":"$9/mo"}"#);
        let config = BTreeMap::from([("region".to_string(), "eu".to_string())]);

        let change = transport
            .client()
            .install_addon("demo", "redis:mini", &config)
            .await
            .unwrap();

        assert_eq!(change.price.as_deref(), Some("$9/mo"));
        let request = transport.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.path(), "/apps/demo/addons/redis%3Amini");
        assert_eq!(request.payload, Payload::form([("config[region]", "eu")]));
    }

    #[test_timeout::tokio_timeout_test]
    async fn upgrade_downgrade_and_uninstall() {
        let transport = ScriptedTransport::new();
        transport.ok(r#"{"status":"Upgraded"}"#);
        transport.ok(r#"{"status":"Downgraded"}"#);
        transport.ok(r#"{"message":"removed"}"#);
        let client = transport.client();
        let none = BTreeMap::new();

        client.upgrade_addon("demo", "pg:standard", &none).await.unwrap();
        client.downgrade_addon("demo", "pg:basic", &none).await.unwrap();
        let removed = client.uninstall_addon("demo", "pg:basic").await.unwrap();

        assert_eq!(removed.message.as_deref(), Some("removed"));
        let methods: Vec<Method> = transport
            .requests()
            .into_iter()
            .map(|request| request.method)
            .collect();
        assert_eq!(methods, [Method::PUT, Method::PUT, Method::DELETE]);
    }

    #[test_timeout::tokio_timeout_test]
    async fn lists_catalogue_and_installed() {
        let transport = ScriptedTransport::new();
        transport.ok(r#"[{"name":"redis:mini","beta":true}]"#);
        transport.ok(r#"[{"name":"pg:basic","configured":true}]"#);
        let client = transport.client();

        let catalogue = client.addons().await.unwrap();
        let installed = client.installed_addons("demo").await.unwrap();

        assert!(catalogue[0].beta);
        assert!(installed[0].configured);
        assert_eq!(transport.last_request().url.path(), "/apps/demo/addons");
    }

    #[test_timeout::tokio_timeout_test]
    async fn confirm_billing_uses_configured_user() {
        let transport = ScriptedTransport::new();
        transport.ok("");
        let config = ClientConfig::new(TEST_HOST)
            .unwrap()
            .with_credentials(Some(Credentials::new("ops@example.com", "k")));
        let client = Client::with_transport(config, Arc::new(transport.clone()));

        client.confirm_billing().await.unwrap();

        assert_eq!(
            transport.last_request().url.path(),
            "/user/ops%40example.com/confirm_billing"
        );
    }
}
