use crate::config::MigrationConfig;
use crate::error::ApiError;
use crate::gcp::token::GcpTokenSource;
use crate::migration::ArchiveSink;
use anyhow::{Context, Result};
use async_trait::async_trait;

/// Object path of a report backup: `{directory}/{report_name}.pbix`
pub fn archive_object_path(directory: &str, report_name: &str) -> String {
    let directory = directory.trim_end_matches('/');
    if directory.is_empty() {
        format!("{}.pbix", report_name)
    } else {
        format!("{}/{}.pbix", directory, report_name)
    }
}

/// Backs up exported reports to a Cloud Storage bucket
#[derive(Debug, Clone)]
pub struct GcsArchive {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    directory: String,
    token_source: GcpTokenSource,
}

impl GcsArchive {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.endpoints.storage_url.clone(),
            bucket: config.bucket_name.clone(),
            directory: config.bucket_directory.clone(),
            token_source: GcpTokenSource::from_config(config)?,
        })
    }
}

#[async_trait]
impl ArchiveSink for GcsArchive {
    /// Upload the report, replacing any object already at its path.
    async fn store(&self, content: &[u8], report_name: &str) -> Result<String> {
        let object = archive_object_path(&self.directory, report_name);
        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let token = self.token_source.token().await?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("uploadType", "media"), ("name", object.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content.to_vec())
            .send()
            .await
            .with_context(|| format!("Failed to upload {} to bucket {}", object, self.bucket))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!("Upload of {} failed: {} - {}", object, status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        tracing::info!("Report {} uploaded to {}.", report_name, object);
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;
    use mockito::Matcher;

    #[test]
    fn test_archive_object_path() {
        assert_eq!(
            archive_object_path("fake_directory", "fake_report"),
            "fake_directory/fake_report.pbix"
        );
        assert_eq!(archive_object_path("a/b/", "Report 1"), "a/b/Report 1.pbix");
        assert_eq!(archive_object_path("", "Report 1"), "Report 1.pbix");
    }

    #[tokio::test]
    async fn test_store_uploads_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/storage/v1/b/fake_bucket/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "fake_directory/fake_report.pbix".into()),
            ]))
            .match_header("authorization", "Bearer gcp_token")
            .match_body("fake_report_content")
            .with_status(200)
            .with_body(r#"{"name": "fake_directory/fake_report.pbix"}"#)
            .create_async()
            .await;

        let archive = GcsArchive::new(&test_config(&server.url())).unwrap();
        let path = archive
            .store(b"fake_report_content", "fake_report")
            .await
            .unwrap();

        assert_eq!(path, "fake_directory/fake_report.pbix");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/storage/v1/b/fake_bucket/o")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let archive = GcsArchive::new(&test_config(&server.url())).unwrap();
        let err = archive.store(b"x", "fake_report").await.unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>().map(ApiError::status), Some(403));
    }
}
