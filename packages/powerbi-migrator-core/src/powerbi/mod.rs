//! Power BI REST API access.
//!
//! Workspace lookup, report catalogs, and the export/import pair used to move
//! report files between tenants.

mod client;
mod types;

pub use client::PowerBiClient;
pub use types::{CatalogLookup, ImportDescriptor, Report, Workspace};
