use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Secret holding both tenant credential records, unless overridden
const DEFAULT_SECRET_NAME: &str = "vgm-secrets-powerbi-migration-tenant-creds";

const DEFAULT_POWERBI_API_URL: &str = "https://api.powerbi.com/v1.0/myorg";
const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
const DEFAULT_POWERBI_RESOURCE: &str = "https://analysis.windows.net/powerbi/api";
const DEFAULT_SECRET_MANAGER_URL: &str = "https://secretmanager.googleapis.com";
const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";

/// Export of a large report can take minutes
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const ENV_WORKSPACE_NAME: &str = "WORKSPACE_NAME";
const ENV_IGNORE_REPORTS: &str = "IGNORE_REPORTS";
const ENV_PROJECT_ID: &str = "PROJECT_ID";
const ENV_SECRET_NAME: &str = "SECRET_NAME";
const ENV_BUCKET_NAME: &str = "BUCKET_NAME";
const ENV_BUCKET_DIRECTORY: &str = "BUCKET_DESTINATION_DIRECTORY";
const ENV_GOOGLE_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const ENV_POWERBI_API_URL: &str = "POWERBI_API_URL";
const ENV_AUTHORITY_URL: &str = "POWERBI_AUTHORITY_URL";
const ENV_POWERBI_RESOURCE: &str = "POWERBI_RESOURCE";
const ENV_SECRET_MANAGER_URL: &str = "SECRET_MANAGER_URL";
const ENV_STORAGE_URL: &str = "STORAGE_URL";
const ENV_GOOGLE_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const ENV_REQUEST_TIMEOUT: &str = "MIGRATION_REQUEST_TIMEOUT_SECS";

/// Environment variables understood by [`MigrationConfig::load`], with a short description
pub const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    (ENV_WORKSPACE_NAME, "Workspace name to locate in both tenants (required)"),
    (ENV_IGNORE_REPORTS, "Report names to skip, JSON array or comma-separated"),
    (ENV_PROJECT_ID, "Google Cloud project holding the secret (required)"),
    (ENV_SECRET_NAME, "Secret with the tenant credential records"),
    (ENV_BUCKET_NAME, "Cloud Storage bucket for report backups (required)"),
    (ENV_BUCKET_DIRECTORY, "Object prefix for report backups"),
    (ENV_GOOGLE_ACCESS_TOKEN, "Static Google bearer token (default: application default credentials)"),
    (ENV_GOOGLE_CREDENTIALS, "Service account key file for Google APIs"),
    (ENV_POWERBI_API_URL, "Override Power BI REST API base URL"),
    (ENV_AUTHORITY_URL, "Override identity provider base URL"),
    (ENV_POWERBI_RESOURCE, "Override OAuth resource requested for Power BI"),
    (ENV_SECRET_MANAGER_URL, "Override Secret Manager base URL"),
    (ENV_STORAGE_URL, "Override Cloud Storage base URL"),
    (ENV_REQUEST_TIMEOUT, "Per-request timeout in seconds"),
];

/// Configuration file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct ConfigFile {
    migration: Option<MigrationSection>,
    gcp: Option<GcpSection>,
    endpoints: Option<EndpointsSection>,
}

#[derive(Debug, Deserialize, Default)]
struct MigrationSection {
    workspace_name: Option<String>,
    ignore_reports: Option<Vec<String>>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GcpSection {
    project_id: Option<String>,
    secret_name: Option<String>,
    bucket_name: Option<String>,
    bucket_directory: Option<String>,
    access_token: Option<String>,
    credentials_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EndpointsSection {
    powerbi_api_url: Option<String>,
    authority_url: Option<String>,
    powerbi_resource: Option<String>,
    secret_manager_url: Option<String>,
    storage_url: Option<String>,
}

/// Base URLs of every remote system the migrator talks to
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub powerbi_api_url: String,
    pub authority_url: String,
    pub powerbi_resource: String,
    pub secret_manager_url: String,
    pub storage_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            powerbi_api_url: DEFAULT_POWERBI_API_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            powerbi_resource: DEFAULT_POWERBI_RESOURCE.to_string(),
            secret_manager_url: DEFAULT_SECRET_MANAGER_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
        }
    }
}

/// Runtime configuration, built once at startup and passed down by reference
#[derive(Clone)]
pub struct MigrationConfig {
    /// Display name of the workspace, identical in both tenants
    pub workspace_name: String,
    /// Report names never migrated
    pub ignore_reports: BTreeSet<String>,
    pub project_id: String,
    pub secret_name: String,
    pub bucket_name: String,
    /// Object prefix for backups, without trailing slash (may be empty)
    pub bucket_directory: String,
    /// Static Google bearer token, used instead of any credentials when set
    pub google_access_token: Option<String>,
    /// Service account key file; without one the application default credentials apply
    pub google_credentials_file: Option<PathBuf>,
    pub endpoints: Endpoints,
    pub request_timeout: Duration,
    /// Config file that contributed values, if any
    pub config_file: Option<PathBuf>,
}

impl std::fmt::Debug for MigrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("workspace_name", &self.workspace_name)
            .field("ignore_reports", &self.ignore_reports)
            .field("project_id", &self.project_id)
            .field("secret_name", &self.secret_name)
            .field("bucket_name", &self.bucket_name)
            .field("bucket_directory", &self.bucket_directory)
            .field(
                "google_access_token",
                &self.google_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("google_credentials_file", &self.google_credentials_file)
            .field("endpoints", &self.endpoints)
            .field("request_timeout", &self.request_timeout)
            .field("config_file", &self.config_file)
            .finish()
    }
}

impl MigrationConfig {
    /// Load configuration with priority:
    /// 1. Environment variables
    /// 2. Config file (`--config` path, or ~/.config/powerbi-migrator/config.toml)
    /// 3. Default values
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) if !p.exists() => {
                return Err(anyhow::anyhow!("Config file {:?} does not exist", p));
            }
            Some(p) => Some(p.to_path_buf()),
            None => get_config_file_path(),
        };

        let file = match &path {
            Some(p) => load_config_file(p)?,
            None => None,
        };

        let loaded_from = file.as_ref().and(path);
        let env = |key: &str| std::env::var(key).ok();
        Self::from_sources(&env, file.unwrap_or_default(), loaded_from)
    }

    pub(crate) fn from_sources(
        env: &dyn Fn(&str) -> Option<String>,
        file: ConfigFile,
        config_file: Option<PathBuf>,
    ) -> Result<Self> {
        let migration = file.migration.unwrap_or_default();
        let gcp = file.gcp.unwrap_or_default();
        let endpoints = file.endpoints.unwrap_or_default();

        let workspace_name = pick(env, ENV_WORKSPACE_NAME, migration.workspace_name)
            .ok_or(ConfigError::Missing { key: ENV_WORKSPACE_NAME })?;
        let project_id = pick(env, ENV_PROJECT_ID, gcp.project_id)
            .ok_or(ConfigError::Missing { key: ENV_PROJECT_ID })?;
        let bucket_name = pick(env, ENV_BUCKET_NAME, gcp.bucket_name)
            .ok_or(ConfigError::Missing { key: ENV_BUCKET_NAME })?;

        let ignore_reports = match env(ENV_IGNORE_REPORTS) {
            Some(raw) => parse_ignore_list(&raw)?,
            None => migration
                .ignore_reports
                .unwrap_or_default()
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        };

        let request_timeout_secs = match env(ENV_REQUEST_TIMEOUT) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT,
                message: e.to_string(),
            })?,
            None => migration
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        // A zero timeout fails every request immediately
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT,
                message: "timeout must be at least one second".to_string(),
            }
            .into());
        }

        let bucket_directory = pick(env, ENV_BUCKET_DIRECTORY, gcp.bucket_directory)
            .map(|dir| dir.trim_end_matches('/').to_string())
            .unwrap_or_default();

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            powerbi_api_url: pick_url(env, ENV_POWERBI_API_URL, endpoints.powerbi_api_url)
                .unwrap_or(defaults.powerbi_api_url),
            authority_url: pick_url(env, ENV_AUTHORITY_URL, endpoints.authority_url)
                .unwrap_or(defaults.authority_url),
            powerbi_resource: pick(env, ENV_POWERBI_RESOURCE, endpoints.powerbi_resource)
                .unwrap_or(defaults.powerbi_resource),
            secret_manager_url: pick_url(env, ENV_SECRET_MANAGER_URL, endpoints.secret_manager_url)
                .unwrap_or(defaults.secret_manager_url),
            storage_url: pick_url(env, ENV_STORAGE_URL, endpoints.storage_url)
                .unwrap_or(defaults.storage_url),
        };

        Ok(Self {
            workspace_name,
            ignore_reports,
            project_id,
            secret_name: pick(env, ENV_SECRET_NAME, gcp.secret_name)
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
            bucket_name,
            bucket_directory,
            google_access_token: pick(env, ENV_GOOGLE_ACCESS_TOKEN, gcp.access_token),
            google_credentials_file: pick(env, ENV_GOOGLE_CREDENTIALS, gcp.credentials_file)
                .map(PathBuf::from),
            endpoints,
            request_timeout: Duration::from_secs(request_timeout_secs),
            config_file,
        })
    }
}

/// Environment value first, then file value; blanks count as unset
fn pick(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    file_value: Option<String>,
) -> Option<String> {
    env(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            file_value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
}

fn pick_url(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    file_value: Option<String>,
) -> Option<String> {
    pick(env, key, file_value)
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}

/// Parse the ignore list: either a JSON array of names or a comma-separated list
pub fn parse_ignore_list(raw: &str) -> Result<BTreeSet<String>, ConfigError> {
    let raw = raw.trim();
    let names: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
            key: ENV_IGNORE_REPORTS,
            message: e.to_string(),
        })?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Get the path to the configuration file
fn get_config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|p| p.join("powerbi-migrator").join("config.toml"))
}

/// Load configuration from a config file; a missing file is not an error
fn load_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        tracing::debug!("No config file at {:?}", path);
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    tracing::debug!("Loaded config from {:?}", path);
    Ok(Some(config))
}

/// Get the path to the config file for documentation purposes
pub fn get_config_file_path_string() -> String {
    get_config_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/powerbi-migrator/config.toml".to_string())
}

/// Generate example config file content
pub fn generate_example_config() -> String {
    r#"# Power BI Migrator Configuration
# Place this file at: ~/.config/powerbi-migrator/config.toml
# Environment variables take precedence over every entry below.

[migration]
workspace_name = "Finance"
# ignore_reports = ["Sandbox", "Old KPI"]
# request_timeout_secs = 300

[gcp]
project_id = "my-project"
# secret_name = "vgm-secrets-powerbi-migration-tenant-creds"
bucket_name = "powerbi-backups"
# bucket_directory = "migration/finance"
# credentials_file = "/path/to/service-account.json"

# [endpoints]
# powerbi_api_url = "https://api.powerbi.com/v1.0/myorg"
# authority_url = "https://login.microsoftonline.com"
"#
    .to_string()
}
