//! Contact model
//!
//! A person or company in the contact directory, keyed by its canonical tax
//! identifier. Names use the empty string for "not known"; a contact without
//! an identifier carries `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::nullable::or_default;

/// A partner (sócio) of a company, as listed by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    /// Partner name
    #[serde(
        default,
        deserialize_with = "or_default",
        alias = "nome",
        alias = "nome_socio"
    )]
    pub name: String,

    /// Role within the company (e.g. "Sócio-Administrador")
    #[serde(
        default,
        deserialize_with = "or_default",
        alias = "qualificacao_socio",
        alias = "tipo"
    )]
    pub role: String,

    /// Partner identifier as published (usually masked for people)
    #[serde(
        default,
        deserialize_with = "or_default",
        alias = "cnpj_cpf_do_socio",
        alias = "cpf_cnpj"
    )]
    pub tax_id: String,

    /// Age bracket, when the registry publishes one
    #[serde(
        default,
        alias = "faixa_etaria",
        skip_serializing_if = "Option::is_none"
    )]
    pub age_range: Option<String>,
}

impl Partner {
    /// Create a partner with a name and role
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            tax_id: String::new(),
            age_range: None,
        }
    }
}

/// A contact in the directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Canonical digits (11 for people, 14 for companies)
    #[serde(default, alias = "cpf_cnpj")]
    pub tax_id: Option<String>,

    /// Name used for display and alias backfill
    #[serde(default, deserialize_with = "or_default", alias = "nome")]
    pub display_name: String,

    /// Registered legal name (razão social)
    #[serde(default, deserialize_with = "or_default", alias = "razao_social")]
    pub legal_name: String,

    /// Trade name (nome fantasia)
    #[serde(default, deserialize_with = "or_default", alias = "nome_fantasia")]
    pub trade_name: String,

    /// Company partners, in registry order
    #[serde(default, deserialize_with = "or_default", alias = "socios")]
    pub partners: Vec<Partner>,

    /// Identifier cell as read when it is not a valid CPF or CNPJ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_tax_id: Option<String>,

    /// Partner cell as read when it is not a readable partner list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_partners: Option<String>,
}

impl Contact {
    /// Create a contact with an identifier and display name
    pub fn new(tax_id: Option<String>, display_name: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.filter(|id| !id.is_empty()),
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    /// The identifier, or "" when absent
    pub fn tax_id_str(&self) -> &str {
        self.tax_id.as_deref().unwrap_or("")
    }

    /// Every known name of this contact, display name first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [
            self.display_name.as_str(),
            self.legal_name.as_str(),
            self.trade_name.as_str(),
        ]
        .into_iter()
        .filter(|name| !name.trim().is_empty())
    }

    /// Best name for reports: display, then legal, then trade name
    pub fn best_name(&self) -> &str {
        self.names().next().unwrap_or("")
    }

    /// Fill fields that are unknown here from another record of the same contact
    ///
    /// Known values are never overwritten.
    pub fn merge_missing(&mut self, other: &Contact) {
        if self.tax_id.is_none() {
            self.tax_id = other.tax_id.clone();
        }
        if self.display_name.trim().is_empty() {
            self.display_name = other.display_name.clone();
        }
        if self.legal_name.trim().is_empty() {
            self.legal_name = other.legal_name.clone();
        }
        if self.trade_name.trim().is_empty() {
            self.trade_name = other.trade_name.clone();
        }
        if self.partners.is_empty() && self.raw_partners.is_none() {
            self.partners = other.partners.clone();
            self.raw_partners = other.raw_partners.clone();
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tax_id {
            Some(id) => write!(f, "{} [{}]", self.best_name(), id),
            None => write!(f, "{}", self.best_name()),
        }
    }
}

/// A mutation made to the directory, kept for the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactChange {
    Created(Contact),
    Updated { before: Contact, after: Contact },
}

impl ContactChange {
    /// The contact as it is after the change
    pub fn contact(&self) -> &Contact {
        match self {
            Self::Created(contact) => contact,
            Self::Updated { after, .. } => after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contact_drops_empty_id() {
        let contact = Contact::new(Some(String::new()), "Ana Souza");
        assert!(contact.tax_id.is_none());
        assert_eq!(contact.tax_id_str(), "");
    }

    #[test]
    fn test_names_skip_unknown() {
        let mut contact = Contact::new(None, "");
        contact.legal_name = "ACME COMERCIO LTDA".into();
        contact.trade_name = "Acme".into();

        let names: Vec<&str> = contact.names().collect();
        assert_eq!(names, vec!["ACME COMERCIO LTDA", "Acme"]);
        assert_eq!(contact.best_name(), "ACME COMERCIO LTDA");
    }

    #[test]
    fn test_merge_missing_keeps_known_values() {
        let mut contact = Contact::new(Some("12345678000199".into()), "Acme");
        let mut other = Contact::new(Some("12345678000199".into()), "Other Name");
        other.legal_name = "ACME LTDA".into();

        contact.merge_missing(&other);
        assert_eq!(contact.display_name, "Acme");
        assert_eq!(contact.legal_name, "ACME LTDA");
    }

    #[test]
    fn test_portuguese_keys() {
        let json = r#"{
            "cpf_cnpj": "12345678000199",
            "nome": "Acme",
            "razao_social": "ACME LTDA",
            "socios": [{"nome_socio": "ANA SOUZA", "qualificacao_socio": "Sócio", "faixa_etaria": "31 a 40 anos"}]
        }"#;
        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.tax_id.as_deref(), Some("12345678000199"));
        assert_eq!(contact.partners[0].name, "ANA SOUZA");
        assert_eq!(contact.partners[0].age_range.as_deref(), Some("31 a 40 anos"));
    }
}
