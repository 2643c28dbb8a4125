//! Shared fixtures for unit tests.

use crate::config::{Endpoints, MigrationConfig};
use std::collections::BTreeSet;
use std::time::Duration;

/// Configuration pointing every endpoint at one mock server
pub(crate) fn test_config(base_url: &str) -> MigrationConfig {
    MigrationConfig {
        workspace_name: "fake_workspace".to_string(),
        ignore_reports: BTreeSet::new(),
        project_id: "fake_project_id".to_string(),
        secret_name: "fake-secret".to_string(),
        bucket_name: "fake_bucket".to_string(),
        bucket_directory: "fake_directory".to_string(),
        google_access_token: Some("gcp_token".to_string()),
        google_credentials_file: None,
        endpoints: Endpoints {
            powerbi_api_url: format!("{}/v1.0/myorg", base_url),
            authority_url: base_url.to_string(),
            powerbi_resource: "https://analysis.windows.net/powerbi/api".to_string(),
            secret_manager_url: base_url.to_string(),
            storage_url: base_url.to_string(),
        },
        request_timeout: Duration::from_secs(5),
        config_file: None,
    }
}
