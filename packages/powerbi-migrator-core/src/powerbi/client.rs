use crate::auth::{AccessToken, AuthClient, TenantCredentials};
use crate::config::MigrationConfig;
use crate::error::ApiError;
use crate::migration::ReportService;
use crate::powerbi::types::{CatalogLookup, ImportDescriptor, ODataList, Report, Workspace};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};

#[derive(Debug, Clone)]
pub struct PowerBiClient {
    http: reqwest::Client,
    api_url: String,
    auth: AuthClient,
}

impl PowerBiClient {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_url: config.endpoints.powerbi_api_url.clone(),
            auth: AuthClient::new(config)?,
        })
    }

    /// Find the id of the first workspace whose name equals `name` exactly.
    pub async fn find_workspace(&self, token: &AccessToken, name: &str) -> Result<Option<String>> {
        let url = format!("{}/groups", self.api_url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .context("Failed to list workspaces")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let workspaces = resp
            .json::<ODataList<Workspace>>()
            .await
            .context("Failed to parse workspace list")?;

        let found = workspaces
            .value
            .into_iter()
            .find(|ws| ws.name == name)
            .map(|ws| ws.id);

        match &found {
            Some(id) => tracing::debug!("Workspace '{}' resolved to {}", name, id),
            None => tracing::warn!("Workspace '{}' not found", name),
        }
        Ok(found)
    }

    /// List the reports of a workspace.
    ///
    /// A rejected listing is logged and reported as [`CatalogLookup::LookupFailed`]
    /// rather than an error.
    pub async fn list_reports(&self, token: &AccessToken, workspace_id: &str) -> Result<CatalogLookup> {
        let url = format!("{}/groups/{}/reports", self.api_url, workspace_id);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .context("Failed to list reports")?;

        if resp.status() != StatusCode::OK {
            let status = resp.status().as_u16();
            tracing::error!(
                "Error {} -- Something went wrong when trying to retrieve the list of reports in the workspace {}",
                status,
                workspace_id
            );
            return Ok(CatalogLookup::LookupFailed { status });
        }

        let reports = resp
            .json::<ODataList<Report>>()
            .await
            .context("Failed to parse report list")?;

        Ok(CatalogLookup::Found(reports.value))
    }

    /// Download a report's packaged file.
    pub async fn export_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<Vec<u8>> {
        let url = format!(
            "{}/groups/{}/reports/{}/Export",
            self.api_url, workspace_id, report_id
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .context("Failed to export report")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = resp
            .bytes()
            .await
            .context("Failed to read exported report")?;

        tracing::debug!("Exported report {} ({} bytes)", report_id, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Upload a report file into a workspace under `display_name`.
    ///
    /// Only 202 Accepted counts as success; the server finishes the import
    /// asynchronously and this does not poll for completion. Any other status
    /// is logged and yields `None`. An accepted import whose body cannot be
    /// read as a descriptor yields an empty descriptor.
    pub async fn import_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        display_name: &str,
        content: &[u8],
    ) -> Result<Option<ImportDescriptor>> {
        let url = format!("{}/groups/{}/imports", self.api_url, workspace_id);

        let part = Part::bytes(content.to_vec()).file_name(format!("{}.pbix", display_name));
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token.as_str())
            .query(&[("datasetDisplayName", display_name)])
            .multipart(form)
            .send()
            .await
            .context("Failed to import report")?;

        if resp.status() != StatusCode::ACCEPTED {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Import of '{}' rejected: {} - {}", display_name, status, body);
            return Ok(None);
        }

        let body = resp.bytes().await.unwrap_or_default();
        let descriptor = match serde_json::from_slice::<ImportDescriptor>(&body) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(
                    "Import of '{}' accepted without a readable descriptor: {}",
                    display_name,
                    e
                );
                ImportDescriptor::default()
            }
        };

        Ok(Some(descriptor))
    }
}

#[async_trait]
impl ReportService for PowerBiClient {
    async fn authenticate(&self, credentials: &TenantCredentials) -> Result<AccessToken> {
        self.auth.authenticate(credentials).await
    }

    async fn find_workspace(&self, token: &AccessToken, name: &str) -> Result<Option<String>> {
        PowerBiClient::find_workspace(self, token, name).await
    }

    async fn list_reports(&self, token: &AccessToken, workspace_id: &str) -> Result<CatalogLookup> {
        PowerBiClient::list_reports(self, token, workspace_id).await
    }

    async fn export_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<Vec<u8>> {
        PowerBiClient::export_report(self, token, workspace_id, report_id).await
    }

    async fn import_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        display_name: &str,
        content: &[u8],
    ) -> Result<Option<ImportDescriptor>> {
        PowerBiClient::import_report(self, token, workspace_id, display_name, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;
    use mockito::Matcher;

    fn token() -> AccessToken {
        AccessToken::new("fake_token")
    }

    #[tokio::test]
    async fn test_find_workspace_first_match_wins() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1.0/myorg/groups")
            .match_header("authorization", "Bearer fake_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"value": [
                    {"id": "other", "name": "fake_workspace_2"},
                    {"id": "first", "name": "fake_workspace"},
                    {"id": "second", "name": "fake_workspace"}
                ]}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();

        let found = client.find_workspace(&token(), "fake_workspace").await.unwrap();
        assert_eq!(found.as_deref(), Some("first"));

        let missing = client.find_workspace(&token(), "Fake_Workspace").await.unwrap();
        assert_eq!(missing, None);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_workspace_status_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1.0/myorg/groups")
            .with_status(403)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let err = client.find_workspace(&token(), "fake_workspace").await.unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>().map(ApiError::status), Some(403));
    }

    #[tokio::test]
    async fn test_list_reports() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1.0/myorg/groups/ws1/reports")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"@odata.context": "x", "value": [
                    {"id": "fake_report_id", "name": "fake_report", "webUrl": "https://example"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let lookup = client.list_reports(&token(), "ws1").await.unwrap();

        assert_eq!(
            lookup,
            CatalogLookup::Found(vec![Report::new("fake_report_id", "fake_report")])
        );
    }

    #[tokio::test]
    async fn test_list_reports_failure_is_distinct_from_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1.0/myorg/groups/ws1/reports")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/v1.0/myorg/groups/ws2/reports")
            .with_status(200)
            .with_body(r#"{"value": []}"#)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();

        let failed = client.list_reports(&token(), "ws1").await.unwrap();
        assert_eq!(failed, CatalogLookup::LookupFailed { status: 404 });
        assert!(failed.into_reports().is_empty());

        let empty = client.list_reports(&token(), "ws2").await.unwrap();
        assert_eq!(empty, CatalogLookup::Found(Vec::new()));
    }

    #[tokio::test]
    async fn test_export_report_returns_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1.0/myorg/groups/ws1/reports/r1/Export")
            .match_header("authorization", "Bearer fake_token")
            .with_status(200)
            .with_body(b"fake_report_content".to_vec())
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let content = client.export_report(&token(), "ws1", "r1").await.unwrap();
        assert_eq!(content, b"fake_report_content".to_vec());
    }

    #[tokio::test]
    async fn test_export_report_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1.0/myorg/groups/ws1/reports/r1/Export")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let err = client.export_report(&token(), "ws1", "r1").await.unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>().map(ApiError::status), Some(500));
    }

    #[tokio::test]
    async fn test_import_report_accepted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1.0/myorg/groups/ws2/imports")
            .match_query(Matcher::UrlEncoded(
                "datasetDisplayName".into(),
                "Report 1".into(),
            ))
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .match_body(Matcher::Regex("fake_report_content".into()))
            .with_status(202)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "fake_import_id"}"#)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let descriptor = client
            .import_report(&token(), "ws2", "Report 1", b"fake_report_content")
            .await
            .unwrap()
            .expect("accepted import");

        assert_eq!(descriptor.id.as_deref(), Some("fake_import_id"));
        assert_eq!(descriptor.to_string(), "import fake_import_id");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_report_accepted_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1.0/myorg/groups/ws2/imports")
            .match_query(Matcher::Any)
            .with_status(202)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let descriptor = client
            .import_report(&token(), "ws2", "Report 1", b"content")
            .await
            .unwrap()
            .expect("accepted import");

        assert_eq!(descriptor, ImportDescriptor::default());
        assert_eq!(descriptor.to_string(), "import (no id returned)");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_import_report_accepted_with_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1.0/myorg/groups/ws2/imports")
            .match_query(Matcher::Any)
            .with_status(202)
            .with_body("Accepted")
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let result = client
            .import_report(&token(), "ws2", "Report 1", b"content")
            .await
            .unwrap();

        assert!(result.is_some_and(|d| d.id.is_none()));
    }

    #[tokio::test]
    async fn test_import_report_non_accepted_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1.0/myorg/groups/ws2/imports")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": {"code": "DuplicatePackageNotFoundError"}}"#)
            .create_async()
            .await;

        let client = PowerBiClient::new(&test_config(&server.url())).unwrap();
        let result = client
            .import_report(&token(), "ws2", "Report 1", b"content")
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
