//! Sequential report migration between two tenants' workspaces of the same name.

use crate::auth::{AccessToken, TenantCredentials, TenantSecrets};
use crate::config::MigrationConfig;
use crate::error::{MigrationError, Tenant};
use crate::migration::index::{DestinationIndex, NameMatch};
use crate::migration::outcome::{MigrationSummary, ReportOutcome, ReportRecord};
use crate::migration::{ArchiveSink, ReportService, SecretProvider};
use crate::powerbi::{CatalogLookup, Report};
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// Decision for one source report, without transferring anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Migrate,
    Ignored,
    AlreadyPresent,
    DuplicateInRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedReport {
    pub report: Report,
    pub action: PlannedAction,
}

/// Token and workspace id for one tenant
struct TenantSession {
    token: AccessToken,
    workspace_id: String,
}

/// State built before the per-report loop starts
struct Session {
    source: TenantSession,
    destination: TenantSession,
    source_reports: Vec<Report>,
    index: DestinationIndex,
}

pub struct Migrator<'a, P, S, A> {
    config: &'a MigrationConfig,
    secrets: &'a P,
    service: &'a S,
    archive: &'a A,
}

impl<'a, P, S, A> Migrator<'a, P, S, A>
where
    P: SecretProvider,
    S: ReportService,
    A: ArchiveSink,
{
    pub fn new(config: &'a MigrationConfig, secrets: &'a P, service: &'a S, archive: &'a A) -> Self {
        Self {
            config,
            secrets,
            service,
            archive,
        }
    }

    /// Copy every source report missing (by name) from the destination.
    ///
    /// Setup failures abort the run; per-report failures are logged and the
    /// loop moves on to the next report.
    pub async fn run(&self) -> Result<MigrationSummary> {
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now();
        tracing::info!(
            "Migration run {} started for workspace '{}'",
            run_id,
            self.config.workspace_name
        );

        let mut session = self.connect().await?;
        let source_count = session.source_reports.len();
        let destination_count = session.index.len();
        let source_reports = std::mem::take(&mut session.source_reports);

        let mut records = Vec::with_capacity(source_reports.len());
        for report in source_reports {
            if let Some(skip) = self.classify(&report, &session.index) {
                records.push(ReportRecord {
                    report,
                    outcome: skip,
                    elapsed_secs: None,
                });
                continue;
            }

            let start = Instant::now();
            tracing::info!("Report Migration Started for: {}", report.name);
            tracing::debug!("Source report id: {}", report.id);

            let outcome = self.transfer(&session, &report).await;

            // An attempted import counts as present for the rest of the run
            if matches!(
                outcome,
                ReportOutcome::Imported { .. } | ReportOutcome::ImportRejected { .. }
            ) {
                session.index.record_migrated(report.clone());
            }

            let elapsed = start.elapsed().as_secs_f64();
            tracing::info!("Migration took {:.2} seconds!", elapsed);

            records.push(ReportRecord {
                report,
                outcome,
                elapsed_secs: Some(elapsed),
            });
        }

        let summary = MigrationSummary {
            run_id,
            workspace_name: self.config.workspace_name.clone(),
            started_at,
            finished_at: chrono::Utc::now(),
            source_reports: source_count,
            destination_reports: destination_count,
            records,
        };

        let counts = summary.counts();
        tracing::info!(
            "Migration run {} finished: {} imported, {} failed, {} skipped",
            run_id,
            counts.imported,
            summary.failures(),
            counts.ignored + counts.already_present + counts.duplicate_in_run
        );
        Ok(summary)
    }

    /// Classify every source report the way [`Migrator::run`] would, without
    /// exporting, archiving or importing.
    pub async fn plan(&self) -> Result<Vec<PlannedReport>> {
        let mut session = self.connect().await?;
        let source_reports = std::mem::take(&mut session.source_reports);

        let mut planned = Vec::with_capacity(source_reports.len());
        for report in source_reports {
            let action = match self.classify(&report, &session.index) {
                Some(ReportOutcome::Ignored) => PlannedAction::Ignored,
                Some(ReportOutcome::AlreadyPresent) => PlannedAction::AlreadyPresent,
                Some(_) => PlannedAction::DuplicateInRun,
                None => {
                    session.index.record_migrated(report.clone());
                    PlannedAction::Migrate
                }
            };
            planned.push(PlannedReport { report, action });
        }
        Ok(planned)
    }

    /// Resolve credentials, authenticate both tenants and load both catalogs.
    async fn connect(&self) -> Result<Session> {
        let payload = self
            .secrets
            .resolve(&self.config.secret_name)
            .await
            .with_context(|| format!("Failed to resolve secret '{}'", self.config.secret_name))?;
        let secrets = TenantSecrets::from_json(&payload)?;
        // Zeroed on drop
        drop(payload);

        let source = self.open_tenant(Tenant::Source, &secrets.source).await?;
        let source_reports = self.load_catalog(Tenant::Source, &source).await?;
        tracing::info!(
            "Number of reports in the source '{}' workspace : {}",
            self.config.workspace_name,
            source_reports.len()
        );

        let destination = self
            .open_tenant(Tenant::Destination, &secrets.destination)
            .await?;
        // Both tokens are minted; the credentials are no longer needed
        drop(secrets);

        let destination_reports = self.load_catalog(Tenant::Destination, &destination).await?;
        tracing::info!(
            "Number of reports in the destination '{}' workspace : {}",
            self.config.workspace_name,
            destination_reports.len()
        );

        Ok(Session {
            source,
            destination,
            source_reports,
            index: DestinationIndex::new(destination_reports),
        })
    }

    async fn open_tenant(
        &self,
        tenant: Tenant,
        credentials: &TenantCredentials,
    ) -> Result<TenantSession> {
        let token = self
            .service
            .authenticate(credentials)
            .await
            .with_context(|| format!("Failed to authenticate to the {} tenant", tenant))?;

        let name = &self.config.workspace_name;
        let workspace_id = self
            .service
            .find_workspace(&token, name)
            .await
            .with_context(|| format!("Failed to list workspaces in the {} tenant", tenant))?
            .ok_or_else(|| MigrationError::WorkspaceNotFound {
                tenant,
                name: name.clone(),
            })?;

        Ok(TenantSession {
            token,
            workspace_id,
        })
    }

    async fn load_catalog(&self, tenant: Tenant, session: &TenantSession) -> Result<Vec<Report>> {
        let lookup = self
            .service
            .list_reports(&session.token, &session.workspace_id)
            .await
            .with_context(|| format!("Failed to list reports in the {} tenant", tenant))?;

        if let CatalogLookup::LookupFailed { status } = lookup {
            tracing::warn!(
                "Report listing in the {} workspace failed with status {}, treating it as empty",
                tenant,
                status
            );
        }
        Ok(lookup.into_reports())
    }

    /// Outcome for reports that are skipped before any transfer, `None` to migrate
    fn classify(&self, report: &Report, index: &DestinationIndex) -> Option<ReportOutcome> {
        if self.config.ignore_reports.contains(&report.name) {
            tracing::debug!("Report {} is on the ignore list", report.name);
            return Some(ReportOutcome::Ignored);
        }

        match index.find(&report.name) {
            Some(NameMatch::Catalog) => {
                tracing::info!(
                    "Report {} already exists in the destination. Skipping migration.",
                    report.name
                );
                Some(ReportOutcome::AlreadyPresent)
            }
            Some(NameMatch::AppendedThisRun) => {
                tracing::info!(
                    "Report {} was already migrated earlier in this run. Skipping migration.",
                    report.name
                );
                Some(ReportOutcome::DuplicateInRun)
            }
            None => None,
        }
    }

    /// Export, archive, then import one report.
    async fn transfer(&self, session: &Session, report: &Report) -> ReportOutcome {
        let content = match self
            .service
            .export_report(&session.source.token, &session.source.workspace_id, &report.id)
            .await
        {
            Ok(content) if !content.is_empty() => content,
            Ok(_) => {
                tracing::error!("Report Migration Failed for: {} (empty export)", report.name);
                return ReportOutcome::ExportFailed {
                    reason: "export returned no content".to_string(),
                };
            }
            Err(e) => {
                tracing::error!("Report Migration Failed for: {} ({:#})", report.name, e);
                return ReportOutcome::ExportFailed {
                    reason: format!("{:#}", e),
                };
            }
        };

        let archive_path = match self.archive.store(&content, &report.name).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(
                    "Report Migration Failed for: {} (backup failed: {:#})",
                    report.name,
                    e
                );
                return ReportOutcome::ArchiveFailed {
                    reason: format!("{:#}", e),
                };
            }
        };

        match self
            .service
            .import_report(
                &session.destination.token,
                &session.destination.workspace_id,
                &report.name,
                &content,
            )
            .await
        {
            Ok(Some(import)) => {
                tracing::info!(
                    "Report Migration Successful for: {} ({})",
                    report.name,
                    import
                );
                ReportOutcome::Imported {
                    archive_path,
                    import,
                }
            }
            Ok(None) => {
                tracing::error!(
                    "Report Migration Failed for: {} (import not accepted)",
                    report.name
                );
                ReportOutcome::ImportRejected {
                    archive_path,
                    reason: "import not accepted".to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Report Migration Failed for: {} ({:#})", report.name, e);
                ReportOutcome::ImportRejected {
                    archive_path,
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}
