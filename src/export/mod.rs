//! Export module for the reconciler
//!
//! - CSV: candidate links and reconciled transactions (spreadsheet review)
//! - JSON: candidate links with metadata

pub mod csv;
pub mod json;

pub use csv::{export_links_csv, export_transactions_csv, write_links_csv, write_transactions_csv};
pub use json::{export_links_json, write_links_json, LinkExport, LinkMetadata, EXPORT_SCHEMA_VERSION};
