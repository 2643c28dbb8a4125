use crate::config::MigrationConfig;
use anyhow::{Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Scope covering Secret Manager and Cloud Storage
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Where Google API bearer tokens come from
#[derive(Clone)]
pub enum GcpTokenSource {
    /// Token supplied through configuration
    Static(String),
    /// Credentials loaded up front, e.g. a service account key file
    Provider(Arc<dyn TokenProvider>),
    /// Application default credentials, discovered on first use: the
    /// `GOOGLE_APPLICATION_CREDENTIALS` key, a gcloud user login, then the
    /// metadata server
    ApplicationDefault(Arc<OnceCell<Arc<dyn TokenProvider>>>),
}

impl std::fmt::Debug for GcpTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GcpTokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            GcpTokenSource::Provider(_) => f.write_str("Provider"),
            GcpTokenSource::ApplicationDefault(_) => f.write_str("ApplicationDefault"),
        }
    }
}

impl GcpTokenSource {
    pub fn from_config(config: &MigrationConfig) -> Result<Self> {
        if let Some(token) = &config.google_access_token {
            return Ok(GcpTokenSource::Static(token.clone()));
        }
        match &config.google_credentials_file {
            Some(path) => Self::from_key_file(path),
            None => Ok(GcpTokenSource::ApplicationDefault(Arc::new(OnceCell::new()))),
        }
    }

    /// Use a service account key file
    pub fn from_key_file(path: &Path) -> Result<Self> {
        let account = CustomServiceAccount::from_file(path)
            .with_context(|| format!("Failed to load service account key {:?}", path))?;
        Ok(GcpTokenSource::Provider(Arc::new(account)))
    }

    /// Fetch a bearer token. Providers cache tokens until shortly before expiry.
    pub async fn token(&self) -> Result<String> {
        let provider = match self {
            GcpTokenSource::Static(token) => return Ok(token.clone()),
            GcpTokenSource::Provider(provider) => provider,
            GcpTokenSource::ApplicationDefault(cell) => cell
                .get_or_try_init(|| async {
                    let provider = gcp_auth::provider().await?;
                    tracing::debug!("Resolved Google application default credentials");
                    Ok::<_, gcp_auth::Error>(provider)
                })
                .await
                .context("No Google application default credentials found")?,
        };

        let token = provider
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .context("Failed to get a Google access token")?;
        Ok(token.as_str().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    const TEST_PRIVATE_KEY: &str = include_str!("testdata/service_account_key.pem");

    fn write_key_file(token_uri: &str) -> tempfile::NamedTempFile {
        let key = serde_json::json!({
            "type": "service_account",
            "project_id": "fake_project_id",
            "private_key_id": "0123456789abcdef",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": "migrator@fake_project_id.iam.gserviceaccount.com",
            "client_id": "1234567890",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": token_uri,
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", key).unwrap();
        file
    }

    #[tokio::test]
    async fn test_service_account_key_file_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::Regex("jwt-bearer".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "sa_token", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let key_file = write_key_file(&format!("{}/token", server.url()));
        let source = GcpTokenSource::from_key_file(key_file.path()).unwrap();

        assert_eq!(source.token().await.unwrap(), "sa_token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_credentials_file_selected_from_config() {
        let key_file = write_key_file("https://oauth2.googleapis.com/token");
        let mut config = crate::test_support::test_config("http://localhost");

        config.google_access_token = None;
        config.google_credentials_file = Some(key_file.path().to_path_buf());
        assert!(matches!(
            GcpTokenSource::from_config(&config).unwrap(),
            GcpTokenSource::Provider(_)
        ));

        config.google_credentials_file = None;
        assert!(matches!(
            GcpTokenSource::from_config(&config).unwrap(),
            GcpTokenSource::ApplicationDefault(_)
        ));
    }

    #[test]
    fn test_missing_key_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GcpTokenSource::from_key_file(&dir.path().join("absent.json")).is_err());
    }

    #[tokio::test]
    async fn test_static_token_skips_network() {
        let source = GcpTokenSource::Static("static".to_string());
        assert_eq!(source.token().await.unwrap(), "static");
    }

    #[test]
    fn test_debug_redacts_static_token() {
        let source = GcpTokenSource::Static("ya29.secret".to_string());
        let rendered = format!("{:?}", source);

        assert!(!rendered.contains("ya29.secret"));
        assert_eq!(rendered, "Static(<redacted>)");
    }
}
