//! Registry record model
//!
//! The normalized result of a company-registry lookup. Failed lookups carry a
//! typed [`LookupFailure`] instead of company data and are never cached.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::contact::Partner;
use super::nullable::or_default;

/// Why a lookup produced no company data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupFailure {
    /// The identifier can never be a company id; no request was made
    InvalidIdentifier { reason: String },
    /// Every attempt against the registry failed
    Unavailable { attempts: u32, message: String },
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier { reason } => write!(f, "invalid identifier: {}", reason),
            Self::Unavailable { attempts, message } => write!(
                f,
                "registry unavailable after {} attempt(s): {}",
                attempts, message
            ),
        }
    }
}

/// Company data returned by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Normalized 14-digit company identifier
    #[serde(default, deserialize_with = "or_default", alias = "cnpj")]
    pub tax_id: String,

    /// Legal name (razão social)
    #[serde(default, deserialize_with = "or_default", alias = "razao_social")]
    pub legal_name: String,

    /// Trade name (nome fantasia)
    #[serde(default, deserialize_with = "or_default", alias = "nome_fantasia")]
    pub trade_name: String,

    /// Partners in registry order
    #[serde(default, deserialize_with = "or_default", alias = "qsa")]
    pub partners: Vec<Partner>,

    /// Single-line address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Registration status (e.g. "ATIVA")
    #[serde(
        default,
        alias = "descricao_situacao_cadastral",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,

    /// Set when the lookup failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LookupFailure>,
}

impl RegistryRecord {
    /// Create an empty successful record for an identifier
    pub fn new(tax_id: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.into(),
            ..Self::default()
        }
    }

    /// Create an error-tagged record
    pub fn failed(tax_id: impl Into<String>, failure: LookupFailure) -> Self {
        Self {
            tax_id: tax_id.into(),
            error: Some(failure),
            ..Self::default()
        }
    }

    /// Check whether the lookup succeeded
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Name for new contacts: legal name, then trade name, then "Unknown"
    pub fn company_name(&self) -> &str {
        [self.legal_name.as_str(), self.trade_name.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
            .unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record() {
        let record = RegistryRecord::failed(
            "00000000000000",
            LookupFailure::InvalidIdentifier {
                reason: "all zeros".into(),
            },
        );
        assert!(!record.is_ok());
        assert_eq!(
            record.error.as_ref().unwrap().to_string(),
            "invalid identifier: all zeros"
        );
    }

    #[test]
    fn test_company_name_fallbacks() {
        let mut record = RegistryRecord::new("12345678000199");
        assert_eq!(record.company_name(), "Unknown");

        record.trade_name = "Acme".into();
        assert_eq!(record.company_name(), "Acme");

        record.legal_name = "ACME COMERCIO LTDA".into();
        assert_eq!(record.company_name(), "ACME COMERCIO LTDA");
    }

    #[test]
    fn test_accepts_brasilapi_keys() {
        let json = r#"{
            "cnpj": "12345678000199",
            "razao_social": "ACME COMERCIO LTDA",
            "nome_fantasia": "ACME",
            "qsa": [{"nome_socio": "ANA SOUZA", "qualificacao_socio": "Sócio-Administrador"}],
            "descricao_situacao_cadastral": "ATIVA"
        }"#;
        let record: RegistryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tax_id, "12345678000199");
        assert_eq!(record.partners[0].role, "Sócio-Administrador");
        assert_eq!(record.status.as_deref(), Some("ATIVA"));
        assert!(record.is_ok());
    }

    #[test]
    fn test_error_serializes_tagged() {
        let record = RegistryRecord::failed(
            "12345678000199",
            LookupFailure::Unavailable {
                attempts: 3,
                message: "timeout".into(),
            },
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["error"]["kind"], "unavailable");
        assert_eq!(value["error"]["attempts"], 3);
    }
}
