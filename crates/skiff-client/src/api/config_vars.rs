use std::collections::BTreeMap;

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

impl Client {
    pub async fn config_vars(&self, app: &str) -> ClientResult<BTreeMap<String, String>> {
        self.get_json(config_path(app)).await
    }

    pub async fn add_config_vars(
        &self,
        app: &str,
        vars: &BTreeMap<String, String>,
    ) -> ClientResult<()> {
        self.put(config_path(app), Payload::Json(serde_json::to_value(vars)?))
            .await?;
        Ok(())
    }

    pub async fn remove_config_var(&self, app: &str, key: &str) -> ClientResult<()> {
        self.delete(format!("{}/{}", config_path(app), segment(key)))
            .await?;
        Ok(())
    }

    pub async fn clear_config_vars(&self, app: &str) -> ClientResult<()> {
        self.delete(config_path(app)).await?;
        Ok(())
    }
}

fn config_path(app: &str) -> String {
    format!("/apps/{}/config_vars", segment(app))
}
