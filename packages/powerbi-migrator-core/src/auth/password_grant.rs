//! OAuth 2.0 resource owner password grant against the tenant's identity provider.

use crate::auth::credentials::{AccessToken, TenantCredentials};
use crate::config::MigrationConfig;
use crate::error::ApiError;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    authority_url: String,
    resource: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AuthClient {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            authority_url: config.endpoints.authority_url.clone(),
            resource: config.endpoints.powerbi_resource.clone(),
        })
    }

    /// Exchange one tenant's credentials for a bearer token.
    ///
    /// A non-success status is logged with its body and returned as
    /// [`ApiError::Status`]; there is no retry.
    pub async fn authenticate(&self, credentials: &TenantCredentials) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/token", self.authority_url, credentials.tenant_id);

        let form = [
            ("grant_type", "password"),
            ("resource", self.resource.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let resp = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .context("Failed to request access token")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Failed to get access token");
            tracing::error!("Status Code: {}", status);
            tracing::error!("Response Content: {}", body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")?;

        tracing::debug!(
            "Access token issued for tenant {} (client {})",
            credentials.tenant_id,
            credentials.client_id
        );
        Ok(AccessToken::new(token.access_token))
    }
}
