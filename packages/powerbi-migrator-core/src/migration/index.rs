use crate::powerbi::Report;
use std::collections::HashMap;

/// Where a report name was found among the destination's reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Present in the destination catalog listed at the start of the run
    Catalog,
    /// Appended earlier in this run by a migrated report
    AppendedThisRun,
}

/// Destination reports known to the run.
///
/// `by_name` is built once from the catalog and never updated; migrated reports
/// are only appended to `reports`.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    reports: Vec<Report>,
    by_name: HashMap<String, Report>,
}

impl DestinationIndex {
    pub fn new(catalog: Vec<Report>) -> Self {
        let by_name = catalog
            .iter()
            .map(|report| (report.name.clone(), report.clone()))
            .collect();
        Self {
            reports: catalog,
            by_name,
        }
    }

    /// Exact, case-sensitive name match
    pub fn find(&self, name: &str) -> Option<NameMatch> {
        if self.by_name.contains_key(name) {
            return Some(NameMatch::Catalog);
        }
        if self.reports.iter().any(|report| report.name == name) {
            return Some(NameMatch::AppendedThisRun);
        }
        None
    }

    pub fn record_migrated(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn in_lookup(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_match_is_exact() {
        let index = DestinationIndex::new(vec![Report::new("d1", "Sales")]);
        assert_eq!(index.find("Sales"), Some(NameMatch::Catalog));
        assert_eq!(index.find("sales"), None);
        assert_eq!(index.find("Sales "), None);
    }

    #[test]
    fn test_record_migrated_appends_without_touching_lookup() {
        let mut index = DestinationIndex::new(Vec::new());
        index.record_migrated(Report::new("1", "Report 1"));

        assert_eq!(index.len(), 1);
        assert!(!index.in_lookup("Report 1"));
        assert_eq!(index.find("Report 1"), Some(NameMatch::AppendedThisRun));
    }
}
