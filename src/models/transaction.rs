//! Transaction model
//!
//! A statement line as produced by the external statement parser, plus the
//! match results the reconciliation engine attaches to it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::contact::Contact;
use super::money::Money;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(alias = "debit", alias = "Débito", alias = "Debito", alias = "DEBITO")]
    Debit,
    #[serde(alias = "credit", alias = "Crédito", alias = "Credito", alias = "CREDITO")]
    Credit,
}

impl TransactionType {
    /// Negative amounts are debits
    pub fn from_amount(amount: Money) -> Self {
        if amount.is_negative() {
            Self::Debit
        } else {
            Self::Credit
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debit => write!(f, "Debit"),
            Self::Credit => write!(f, "Credit"),
        }
    }
}

/// Outcome of reconciliation for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not yet processed by the engine
    #[default]
    Unresolved,
    /// A contact was attached
    Attached,
    /// Processing finished without any candidate
    NoCandidate,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::Attached => write!(f, "attached"),
            Self::NoCandidate => write!(f, "no_candidate"),
        }
    }
}

/// Which identifier comparison produced the attached contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Suffix,
    Substring,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Suffix => write!(f, "suffix"),
            Self::Substring => write!(f, "substring"),
        }
    }
}

/// A bank-statement transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransactionRecord")]
pub struct Transaction {
    /// Posting date
    pub date: NaiveDate,

    /// Bank document number
    pub document: String,

    /// Free-text description from the statement
    pub description: String,

    /// Amount (negative for debits)
    pub amount: Money,

    /// Debit or credit
    pub transaction_type: TransactionType,

    /// Identifier as it appears on the statement, possibly masked with '*'
    pub partial_identifier: String,

    /// Payee name as it appears on the statement
    pub payee_name: String,

    /// TED transfer code, when the description carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ted_code: Option<String>,

    /// Every contact that passed identifier and name checks, in directory order
    pub matched_contacts: Vec<Contact>,

    /// Best match (first in directory order)
    pub contact: Option<Contact>,

    /// Engine outcome
    pub match_status: MatchStatus,

    /// How `contact` was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_method: Option<MatchMethod>,
}

impl Transaction {
    /// Create a transaction with the statement fields only
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: Money) -> Self {
        Self {
            date,
            document: String::new(),
            description: description.into(),
            amount,
            transaction_type: TransactionType::from_amount(amount),
            partial_identifier: String::new(),
            payee_name: String::new(),
            ted_code: None,
            matched_contacts: Vec::new(),
            contact: None,
            match_status: MatchStatus::Unresolved,
            match_method: None,
        }
    }

    /// Set the identifier and payee name the statement parser found
    pub fn with_party(
        mut self,
        partial_identifier: impl Into<String>,
        payee_name: impl Into<String>,
    ) -> Self {
        self.partial_identifier = partial_identifier.into();
        self.payee_name = payee_name.into();
        self
    }

    /// Drop any previous match results
    pub fn clear_match(&mut self) {
        self.matched_contacts.clear();
        self.contact = None;
        self.match_status = MatchStatus::Unresolved;
        self.match_method = None;
    }

    /// Check whether a contact has been attached
    pub fn is_attached(&self) -> bool {
        self.contact.is_some()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.date.format("%d/%m/%Y"),
            self.amount,
            self.description,
            self.match_status
        )
    }
}

/// Wire shape accepted at the ingestion boundary
///
/// Accepts the English field names as well as the keys written by the
/// statement parser (`data`, `descricao`, `valor`, `cpf_cnpj_parcial`, ...).
#[derive(Deserialize)]
struct TransactionRecord {
    #[serde(alias = "data", deserialize_with = "flexible_date::deserialize")]
    date: NaiveDate,
    #[serde(default, alias = "documento")]
    document: String,
    #[serde(default, alias = "descricao")]
    description: String,
    #[serde(alias = "valor")]
    amount: Money,
    #[serde(default, alias = "tipo_transacao")]
    transaction_type: Option<TransactionType>,
    #[serde(default, alias = "cpf_cnpj_parcial")]
    partial_identifier: Option<String>,
    #[serde(default, alias = "favorecido", alias = "nome_favorecido")]
    payee_name: Option<String>,
    #[serde(default, alias = "cod_ted")]
    ted_code: Option<String>,
    #[serde(default)]
    matched_contacts: Vec<Contact>,
    #[serde(default, alias = "contato")]
    contact: Option<Contact>,
    #[serde(default)]
    match_status: MatchStatus,
    #[serde(default)]
    match_method: Option<MatchMethod>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Self {
            date: record.date,
            document: record.document,
            description: record.description,
            amount: record.amount,
            transaction_type: record
                .transaction_type
                .unwrap_or_else(|| TransactionType::from_amount(record.amount)),
            partial_identifier: record.partial_identifier.unwrap_or_default(),
            payee_name: record.payee_name.unwrap_or_default(),
            ted_code: record.ted_code.filter(|code| !code.is_empty()),
            matched_contacts: record.matched_contacts,
            contact: record.contact,
            match_status: record.match_status,
            match_method: record.match_method,
        }
    }
}

/// Dates as ISO (`2025-03-01`) or Brazilian (`01/03/2025`) strings
mod flexible_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d/%m/%y"];

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date: {}", raw)))
    }
}
