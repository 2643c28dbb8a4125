use serde::{Deserialize, Serialize};

/// OData list envelope returned by the Power BI REST API
#[derive(Debug, Deserialize)]
pub(crate) struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

/// A report as listed in a workspace catalog; content is fetched lazily via export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub name: String,
}

impl Report {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Result of listing a workspace's reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLookup {
    /// The listing succeeded (possibly empty)
    Found(Vec<Report>),
    /// The service rejected the listing with this status
    LookupFailed { status: u16 },
}

impl CatalogLookup {
    /// Reports in the catalog; a failed lookup counts as no reports
    pub fn into_reports(self) -> Vec<Report> {
        match self {
            CatalogLookup::Found(reports) => reports,
            CatalogLookup::LookupFailed { .. } => Vec::new(),
        }
    }
}

/// Descriptor returned when the service accepts an import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl std::fmt::Display for ImportDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "import {}", id),
            None => write!(f, "import (no id returned)"),
        }
    }
}
