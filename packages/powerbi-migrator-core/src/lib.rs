//! Power BI Migrator Core Library
//!
//! This crate provides everything needed to copy Power BI reports between two
//! tenants' workspaces of the same name:
//! - Tenant credentials from Google Secret Manager
//! - Password-grant authentication per tenant
//! - Workspace lookup, report catalogs, export and import
//! - Report backups to Google Cloud Storage
//! - The sequential migration run itself
//!
//! # Example
//!
//! ```no_run
//! use powerbi_migrator_core::{GcsArchive, MigrationConfig, Migrator, PowerBiClient, SecretManagerClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::load(None)?;
//!
//!     let secrets = SecretManagerClient::new(&config)?;
//!     let powerbi = PowerBiClient::new(&config)?;
//!     let archive = GcsArchive::new(&config)?;
//!
//!     let summary = Migrator::new(&config, &secrets, &powerbi, &archive).run().await?;
//!     println!("Imported {} reports", summary.counts().imported);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod gcp;
pub mod migration;
pub mod powerbi;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use auth::{AccessToken, AuthClient, TenantCredentials, TenantSecrets};
pub use config::{Endpoints, MigrationConfig};
pub use error::{ApiError, ConfigError, MigrationError, Tenant};
pub use gcp::{GcpTokenSource, GcsArchive, SecretManagerClient};
pub use migration::{
    ArchiveSink, MigrationSummary, Migrator, PlannedAction, PlannedReport, ReportOutcome,
    ReportService, SecretProvider,
};
pub use powerbi::{CatalogLookup, ImportDescriptor, PowerBiClient, Report, Workspace};
