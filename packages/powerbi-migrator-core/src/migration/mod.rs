//! Migration orchestration.
//!
//! The orchestrator only talks to the outside world through three seams:
//! [`SecretProvider`], [`ReportService`] and [`ArchiveSink`].

mod index;
mod orchestrator;
mod outcome;

pub use index::{DestinationIndex, NameMatch};
pub use orchestrator::{Migrator, PlannedAction, PlannedReport};
pub use outcome::{MigrationSummary, OutcomeCounts, ReportOutcome, ReportRecord};

use crate::auth::{AccessToken, TenantCredentials};
use crate::powerbi::{CatalogLookup, ImportDescriptor};
use anyhow::Result;
use async_trait::async_trait;
use zeroize::Zeroizing;

/// Resolves a named secret to its string payload, zeroed when dropped
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn resolve(&self, secret_name: &str) -> Result<Zeroizing<String>>;
}

/// Persists exported report bytes for backup
#[async_trait]
pub trait ArchiveSink: Send + Sync {
    /// Store `content` under a path derived from `report_name`, returning that path
    async fn store(&self, content: &[u8], report_name: &str) -> Result<String>;
}

/// The report service calls the migration needs, per tenant token
#[async_trait]
pub trait ReportService: Send + Sync {
    async fn authenticate(&self, credentials: &TenantCredentials) -> Result<AccessToken>;

    async fn find_workspace(&self, token: &AccessToken, name: &str) -> Result<Option<String>>;

    async fn list_reports(&self, token: &AccessToken, workspace_id: &str) -> Result<CatalogLookup>;

    async fn export_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        report_id: &str,
    ) -> Result<Vec<u8>>;

    async fn import_report(
        &self,
        token: &AccessToken,
        workspace_id: &str,
        display_name: &str,
        content: &[u8],
    ) -> Result<Option<ImportDescriptor>>;
}
