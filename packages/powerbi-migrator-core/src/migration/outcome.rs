use crate::powerbi::{ImportDescriptor, Report};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Terminal state of one source report after a single pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Ignored,
    AlreadyPresent,
    DuplicateInRun,
    Imported {
        archive_path: String,
        import: ImportDescriptor,
    },
    ImportRejected {
        archive_path: String,
        reason: String,
    },
    ExportFailed {
        reason: String,
    },
    ArchiveFailed {
        reason: String,
    },
}

impl ReportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReportOutcome::Ignored => "ignored",
            ReportOutcome::AlreadyPresent => "already present",
            ReportOutcome::DuplicateInRun => "duplicate in run",
            ReportOutcome::Imported { .. } => "imported",
            ReportOutcome::ImportRejected { .. } => "import rejected",
            ReportOutcome::ExportFailed { .. } => "export failed",
            ReportOutcome::ArchiveFailed { .. } => "archive failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ReportOutcome::ImportRejected { .. }
                | ReportOutcome::ExportFailed { .. }
                | ReportOutcome::ArchiveFailed { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub report: Report,
    pub outcome: ReportOutcome,
    /// Wall time of the transfer; `None` for reports skipped before export
    pub elapsed_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub ignored: usize,
    pub already_present: usize,
    pub duplicate_in_run: usize,
    pub imported: usize,
    pub import_rejected: usize,
    pub export_failed: usize,
    pub archive_failed: usize,
}

/// Everything one run did, in source catalog order
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub run_id: Uuid,
    pub workspace_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub source_reports: usize,
    pub destination_reports: usize,
    pub records: Vec<ReportRecord>,
}

impl MigrationSummary {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for record in &self.records {
            match record.outcome {
                ReportOutcome::Ignored => counts.ignored += 1,
                ReportOutcome::AlreadyPresent => counts.already_present += 1,
                ReportOutcome::DuplicateInRun => counts.duplicate_in_run += 1,
                ReportOutcome::Imported { .. } => counts.imported += 1,
                ReportOutcome::ImportRejected { .. } => counts.import_rejected += 1,
                ReportOutcome::ExportFailed { .. } => counts.export_failed += 1,
                ReportOutcome::ArchiveFailed { .. } => counts.archive_failed += 1,
            }
        }
        counts
    }

    pub fn failures(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.outcome.is_failure())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, outcome: ReportOutcome) -> ReportRecord {
        ReportRecord {
            report: Report::new(name, name),
            outcome,
            elapsed_secs: None,
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let now = Utc::now();
        let summary = MigrationSummary {
            run_id: Uuid::new_v4(),
            workspace_name: "ws".to_string(),
            started_at: now,
            finished_at: now,
            source_reports: 4,
            destination_reports: 0,
            records: vec![
                record("a", ReportOutcome::Ignored),
                record("b", ReportOutcome::AlreadyPresent),
                record(
                    "c",
                    ReportOutcome::ExportFailed {
                        reason: "500".to_string(),
                    },
                ),
                record(
                    "d",
                    ReportOutcome::ArchiveFailed {
                        reason: "403".to_string(),
                    },
                ),
            ],
        };

        let counts = summary.counts();
        assert_eq!(counts.ignored, 1);
        assert_eq!(counts.already_present, 1);
        assert_eq!(counts.export_failed, 1);
        assert_eq!(counts.archive_failed, 1);
        assert_eq!(counts.imported, 0);
        assert_eq!(summary.failures(), 2);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(ReportOutcome::ExportFailed {
            reason: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "export_failed");
        assert_eq!(json["reason"], "boom");
    }
}
