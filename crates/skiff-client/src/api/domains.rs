use serde::{Deserialize, Serialize};

use crate::client::{segment, Client};
use crate::error::ClientResult;
use crate::transport::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    #[serde(default)]
    pub base_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslCertificate {
    pub domain: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl Client {
    pub async fn list_domains(&self, app: &str) -> ClientResult<Vec<Domain>> {
        self.get_json(format!("/apps/{}/domains", segment(app))).await
    }

    pub async fn add_domain(&self, app: &str, domain: &str) -> ClientResult<()> {
        self.post(
            format!("/apps/{}/domains", segment(app)),
            Payload::text(domain),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_domain(&self, app: &str, domain: &str) -> ClientResult<()> {
        self.delete(format!(
            "/apps/{}/domains/{}",
            segment(app),
            segment(domain)
        ))
        .await?;
        Ok(())
    }

    pub async fn remove_domains(&self, app: &str) -> ClientResult<()> {
        self.delete(format!("/apps/{}/domains", segment(app))).await?;
        Ok(())
    }

    pub async fn add_ssl(&self, app: &str, pem: &str, key: &str) -> ClientResult<SslCertificate> {
        self.post(
            format!("/apps/{}/ssl", segment(app)),
            Payload::form([("pem", pem), ("key", key)]),
        )
        .await?
        .json()
    }

    pub async fn remove_ssl(&self, app: &str, domain: &str) -> ClientResult<()> {
        self.delete(format!(
            "/apps/{}/domains/{}/ssl",
            segment(app),
            segment(domain)
        ))
        .await?;
        Ok(())
    }

    pub async fn clear_ssl(&self, app: &str) -> ClientResult<()> {
        self.delete(format!("/apps/{}/ssl", segment(app))).await?;
        Ok(())
    }
}
