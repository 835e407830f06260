//! Candidate link model
//!
//! A proposed association between a registry company (or one of its
//! partners) and a directory contact, pending manual review.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which registry name produced the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    LegalName,
    TradeName,
    Partner,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LegalName => write!(f, "legal_name"),
            Self::TradeName => write!(f, "trade_name"),
            Self::Partner => write!(f, "partner"),
        }
    }
}

/// A proposed company/contact association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    /// Company identifier the registry record belongs to
    pub source_tax_id: String,
    /// The registry name that matched (legal, trade or partner name)
    pub source_name: String,
    /// Company name for the report
    pub company_name: String,
    /// Name of the matched contact
    pub matched_contact: String,
    /// Identifier of the matched contact, "" when it has none
    pub matched_tax_id: String,
    pub link_type: LinkType,
    /// Token overlap count, used only for ranking
    pub strength: usize,
}
