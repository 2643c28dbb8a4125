use crate::config::MigrationConfig;
use crate::error::ApiError;
use crate::gcp::token::GcpTokenSource;
use crate::migration::SecretProvider;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use zeroize::Zeroizing;

/// Reads the latest version of a secret through the Secret Manager REST API
#[derive(Debug, Clone)]
pub struct SecretManagerClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    token_source: GcpTokenSource,
}

#[derive(Deserialize)]
struct AccessSecretVersionResponse {
    payload: SecretPayload,
}

#[derive(Deserialize)]
struct SecretPayload {
    data: String,
}

impl SecretManagerClient {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.endpoints.secret_manager_url.clone(),
            project_id: config.project_id.clone(),
            token_source: GcpTokenSource::from_config(config)?,
        })
    }

    fn version_url(&self, secret_name: &str) -> String {
        format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.base_url, self.project_id, secret_name
        )
    }
}

#[async_trait]
impl SecretProvider for SecretManagerClient {
    async fn resolve(&self, secret_name: &str) -> Result<Zeroizing<String>> {
        let token = self.token_source.token().await?;

        let resp = self
            .http
            .get(self.version_url(secret_name))
            .bearer_auth(&token)
            .send()
            .await
            .with_context(|| format!("Failed to access secret '{}'", secret_name))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::Error::new(ApiError::Status {
                status: status.as_u16(),
                body,
            })
            .context(format!("Failed to access secret '{}'", secret_name)));
        }

        let version = resp
            .json::<AccessSecretVersionResponse>()
            .await
            .context("Failed to parse secret version response")?;

        let encoded = Zeroizing::new(version.payload.data);
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.as_bytes())
                .context("Secret payload is not valid base64")?,
        );
        let secret = Zeroizing::new(
            std::str::from_utf8(&decoded)
                .context("Secret payload is not valid UTF-8")?
                .to_string(),
        );

        tracing::debug!("Resolved secret '{}' from project {}", secret_name, self.project_id);
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[tokio::test]
    async fn test_resolve_decodes_payload() {
        let mut server = mockito::Server::new_async().await;
        let encoded = STANDARD.encode(r#"{"key": "value"}"#);
        let mock = server
            .mock(
                "GET",
                "/v1/projects/fake_project_id/secrets/fake-secret-name/versions/latest:access",
            )
            .match_header("authorization", "Bearer gcp_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"name": "projects/1/secrets/fake-secret-name/versions/3", "payload": {{"data": "{}"}}}}"#,
                encoded
            ))
            .create_async()
            .await;

        let client = SecretManagerClient::new(&test_config(&server.url())).unwrap();
        let secret = client.resolve("fake-secret-name").await.unwrap();

        assert_eq!(secret.as_str(), r#"{"key": "value"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_denied() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/v1/projects/fake_project_id/secrets/missing/versions/latest:access",
            )
            .with_status(404)
            .with_body(r#"{"error": {"status": "NOT_FOUND"}}"#)
            .create_async()
            .await;

        let client = SecretManagerClient::new(&test_config(&server.url())).unwrap();
        let err = client.resolve("missing").await.unwrap_err();

        assert_eq!(err.downcast_ref::<ApiError>().map(ApiError::status), Some(404));
        assert!(err.to_string().contains("missing"));
    }
}
