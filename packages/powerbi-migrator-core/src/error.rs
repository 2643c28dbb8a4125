//! Typed errors surfaced through `anyhow` so callers can downcast.

use thiserror::Error;

/// Which side of the migration a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tenant {
    Source,
    Destination,
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tenant::Source => write!(f, "source"),
            Tenant::Destination => write!(f, "destination"),
        }
    }
}

/// A remote service answered with a non-success status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server returned error: {status} - {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
        }
    }
}

/// Fatal setup failures that abort the whole run.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Workspace '{name}' not found in the {tenant} tenant")]
    WorkspaceNotFound { tenant: Tenant, name: String },

    #[error("Secret payload has no '{key}' tenant record")]
    MissingTenantRecord { key: &'static str },
}

/// Configuration could not be assembled.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {key} (set the environment variable or the config file entry)")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}
