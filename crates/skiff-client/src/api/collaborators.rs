use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub email: String,
    #[serde(default)]
    pub access: Option<String>,
}

impl Client {
    pub async fn list_collaborators(&self, app: &str) -> ClientResult<Vec<Collaborator>> {
        self.get_json(format!("/apps/{}/collaborators", segment(app)))
            .await
    }

    /// Returns the platform's confirmation message.
    pub async fn add_collaborator(&self, app: &str, email: &str) -> ClientResult<String> {
        let response = self
            .post(
                format!("/apps/{}/collaborators", segment(app)),
                Payload::form([("collaborator[email]", email)]),
            )
            .await?;
        Ok(response.body)
    }

    pub async fn remove_collaborator(&self, app: &str, email: &str) -> ClientResult<()> {
        self.delete(format!(
            "/apps/{}/collaborators/{}",
            segment(app),
            segment(email)
        ))
        .await?;
        Ok(())
    }
}
