//! Tax identifier normalization
//!
//! Brazilian identifiers come in two widths: 11 digits for people (CPF) and
//! 14 for companies (CNPJ). Statements print them formatted, masked with `*`
//! or truncated, so everything here works on the digit run only.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width of a person identifier
pub const PERSON_WIDTH: usize = 11;
/// Width of a company identifier
pub const COMPANY_WIDTH: usize = 14;

/// What an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Person,
    Company,
    Invalid,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Company => write!(f, "company"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Strip everything but ASCII digits
///
/// Never fails; empty input gives an empty string.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Same as [`normalize`] for optional input
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize).unwrap_or_default()
}

fn kind_for_len(len: usize) -> IdentifierKind {
    match len {
        1..=PERSON_WIDTH => IdentifierKind::Person,
        12..=COMPANY_WIDTH => IdentifierKind::Company,
        _ => IdentifierKind::Invalid,
    }
}

/// Classify a digit string and left-pad it with zeros to canonical width
///
/// Invalid identifiers are returned unchanged.
pub fn classify_and_pad(digits: &str) -> (IdentifierKind, String) {
    let digits = normalize(digits);
    let kind = kind_for_len(digits.len());
    let canonical = match kind {
        IdentifierKind::Person => format!("{:0>width$}", digits, width = PERSON_WIDTH),
        IdentifierKind::Company => format!("{:0>width$}", digits, width = COMPANY_WIDTH),
        IdentifierKind::Invalid => digits,
    };
    (kind, canonical)
}

/// Classify a partial identifier without padding it
///
/// A partial run (e.g. the six visible digits of a masked CPF) must keep its
/// length so suffix and substring comparisons stay meaningful.
pub fn classify_partial(digits: &str) -> (IdentifierKind, String) {
    let digits = normalize(digits);
    (kind_for_len(digits.len()), digits)
}

/// Canonical form of a stored identifier, or `None` when it is not usable
pub fn canonical(raw: &str) -> Option<String> {
    match classify_and_pad(raw) {
        (IdentifierKind::Invalid, _) => None,
        (_, canonical) => Some(canonical),
    }
}

/// Why a company identifier was rejected
pub fn company_rejection(digits: &str) -> Option<String> {
    if digits.len() != COMPANY_WIDTH {
        Some(format!(
            "expected {} digits, got {}",
            COMPANY_WIDTH,
            digits.len()
        ))
    } else if digits.chars().all(|c| c == '0') {
        Some("all zeros".to_string())
    } else {
        None
    }
}

/// Exactly 14 digits and not all zero
pub fn is_valid_company(digits: &str) -> bool {
    company_rejection(digits).is_none()
}

/// Whether a statement identifier is a person id shown with a mask
pub fn is_masked(raw: &str) -> bool {
    raw.contains('*')
}
