//! JSON export functionality
//!
//! Candidate links are exported inside a versioned wrapper with a little
//! metadata for the reviewer.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, ReconResult};
use crate::models::{CandidateLink, LinkType};
use crate::storage::file_io::write_atomic;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Candidate link export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    /// Summary counts
    pub metadata: LinkMetadata,

    /// Links in discovery order
    pub links: Vec<CandidateLink>,
}

/// Counts for the link export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub link_count: usize,
    /// Distinct companies with at least one link
    pub company_count: usize,
    /// Distinct contacts with at least one link
    pub contact_count: usize,
    pub legal_name_links: usize,
    pub trade_name_links: usize,
    pub partner_links: usize,
}

impl LinkExport {
    pub fn new(links: Vec<CandidateLink>) -> Self {
        let companies: BTreeSet<&str> = links.iter().map(|l| l.source_tax_id.as_str()).collect();
        let contacts: BTreeSet<(&str, &str)> = links
            .iter()
            .map(|l| (l.matched_tax_id.as_str(), l.matched_contact.as_str()))
            .collect();
        let count = |kind: LinkType| links.iter().filter(|l| l.link_type == kind).count();

        let metadata = LinkMetadata {
            link_count: links.len(),
            company_count: companies.len(),
            contact_count: contacts.len(),
            legal_name_links: count(LinkType::LegalName),
            trade_name_links: count(LinkType::TradeName),
            partner_links: count(LinkType::Partner),
        };

        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            metadata,
            links,
        }
    }
}

/// Export candidate links to JSON
pub fn export_links_json<W: Write>(
    links: &[CandidateLink],
    writer: &mut W,
    pretty: bool,
) -> ReconResult<()> {
    let export = LinkExport::new(links.to_vec());

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| ReconError::Export(e.to_string()))?;

    Ok(())
}

/// Write candidate links to a JSON file atomically
pub fn write_links_json(path: &Path, links: &[CandidateLink]) -> ReconResult<()> {
    write_atomic(path, |writer| export_links_json(links, writer, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(source: &str, contact: &str, link_type: LinkType) -> CandidateLink {
        CandidateLink {
            source_tax_id: source.into(),
            source_name: "ACME COMERCIO LTDA".into(),
            company_name: "ACME COMERCIO LTDA".into(),
            matched_contact: contact.into(),
            matched_tax_id: String::new(),
            link_type,
            strength: 2,
        }
    }

    #[test]
    fn test_link_export_metadata() {
        let export = LinkExport::new(vec![
            link("12345678000199", "Acme", LinkType::LegalName),
            link("12345678000199", "Ana Souza", LinkType::Partner),
            link("98765432000100", "Acme", LinkType::TradeName),
        ]);

        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(export.metadata.link_count, 3);
        assert_eq!(export.metadata.company_count, 2);
        assert_eq!(export.metadata.contact_count, 2);
        assert_eq!(export.metadata.partner_links, 1);
    }

    #[test]
    fn test_links_json_parses_back() {
        let links = vec![link("12345678000199", "Acme", LinkType::LegalName)];
        let mut output = Vec::new();
        export_links_json(&links, &mut output, false).unwrap();

        let parsed: LinkExport = serde_json::from_slice(&output).unwrap();
        assert_eq!(parsed.links, links);
        assert_eq!(parsed.metadata.legal_name_links, 1);
    }
}
