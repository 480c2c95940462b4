use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub contents: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Client {
    pub async fn keys(&self) -> ClientResult<Vec<SshKey>> {
        self.get_json("/user/keys").await
    }

    pub async fn add_key(&self, key: &str) -> ClientResult<()> {
        self.post(
            "/user/keys",
            Payload::Raw {
                content_type: "text/ssh-authkey".into(),
                body: key.trim().to_string(),
            },
        )
        .await?;
        Ok(())
    }

    /// Removes the key identified by its comment (usually `user@host`).
    pub async fn remove_key(&self, key: &str) -> ClientResult<()> {
        self.delete(format!("/user/keys/{}", segment(key))).await?;
        Ok(())
    }

    pub async fn remove_all_keys(&self) -> ClientResult<()> {
        self.delete("/user/keys").await?;
        Ok(())
    }
}
