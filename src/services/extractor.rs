//! Free-text scanner for statement descriptions
//!
//! Pulls the counterpart identifier, the payee name and a TED code out of a
//! description such as
//! `"Pagamento Pix ANA SOUZA ***.123.456-** Banco X"`.
//!
//! Identifier precedence: masked CPF, full CPF, CNPJ, then the last run of
//! six or more digits (of which only the last six are kept).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

fn cpf_like_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9*]{3}\.[0-9*]{3}\.[0-9*]{3}-[0-9*]{2}").expect("invalid cpf regex")
    })
}

fn cnpj_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[0-9]{2}[.\s]?[0-9]{3}[.\s]?[0-9]{3}[/\s]?[0-9]{4}[-\s]?[0-9]{2}\b")
            .expect("invalid cnpj regex")
    })
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{6,}").expect("invalid digit run regex"))
}

fn favored_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)FAV\.:\s*(.*?)(?:\s+Transfer|$)").expect("invalid favored regex")
    })
}

fn pix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:Recebimento Pix|Pagamento Pix)\s+(.*?)(?:\s+[0-9*]{2,3}\.|$)")
            .expect("invalid pix regex")
    })
}

fn ted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CODIGO TED:\s*([A-Za-z0-9]+)").expect("invalid ted regex"))
}

/// Which pattern produced an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierSource {
    MaskedCpf,
    Cpf,
    Cnpj,
    DigitRun,
}

impl fmt::Display for IdentifierSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaskedCpf => write!(f, "masked CPF"),
            Self::Cpf => write!(f, "CPF"),
            Self::Cnpj => write!(f, "CNPJ"),
            Self::DigitRun => write!(f, "digit run"),
        }
    }
}

/// An identifier found in a description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedIdentifier {
    /// Text as it should be stored on the transaction
    pub raw: String,
    pub source: IdentifierSource,
}

/// Everything the scanner found in one description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DescriptionDetails {
    pub identifier: Option<ExtractedIdentifier>,
    pub payee_name: Option<String>,
    pub ted_code: Option<String>,
}

/// Scan a description for identifier, payee and TED code
pub fn scan(description: &str) -> DescriptionDetails {
    DescriptionDetails {
        identifier: extract_identifier(description),
        payee_name: extract_payee(description),
        ted_code: extract_ted_code(description),
    }
}

/// Identifier by pattern precedence
pub fn extract_identifier(description: &str) -> Option<ExtractedIdentifier> {
    let cpf_matches: Vec<&str> = cpf_like_re()
        .find_iter(description)
        .map(|m| m.as_str())
        .collect();

    if let Some(masked) = cpf_matches.iter().find(|m| m.contains('*')) {
        return Some(ExtractedIdentifier {
            raw: masked.to_string(),
            source: IdentifierSource::MaskedCpf,
        });
    }

    if let Some(full) = cpf_matches.first() {
        return Some(ExtractedIdentifier {
            raw: full.to_string(),
            source: IdentifierSource::Cpf,
        });
    }

    if let Some(cnpj) = cnpj_re().find(description) {
        return Some(ExtractedIdentifier {
            raw: cnpj.as_str().trim().to_string(),
            source: IdentifierSource::Cnpj,
        });
    }

    digit_run_re()
        .find_iter(description)
        .last()
        .map(|m| {
            let run = m.as_str();
            ExtractedIdentifier {
                raw: run[run.len() - 6..].to_string(),
                source: IdentifierSource::DigitRun,
            }
        })
}

/// Payee from `FAV.: <name>` or, failing that, `Recebimento/Pagamento Pix <name>`
pub fn extract_payee(description: &str) -> Option<String> {
    let from = |re: &Regex| {
        re.captures(description)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    };
    from(favored_re()).or_else(|| from(pix_re()))
}

/// TED code from `CODIGO TED: <code>`
pub fn extract_ted_code(description: &str) -> Option<String> {
    ted_re()
        .captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_of(description: &str) -> Option<(String, IdentifierSource)> {
        extract_identifier(description).map(|id| (id.raw, id.source))
    }

    #[test]
    fn test_masked_cpf_wins() {
        assert_eq!(
            source_of("Pix 123.456.789-01 ANA ***.123.456-** 99887766"),
            Some(("***.123.456-**".into(), IdentifierSource::MaskedCpf))
        );
    }

    #[test]
    fn test_full_cpf_before_cnpj() {
        assert_eq!(
            source_of("TED 12.345.678/0001-99 ANA 123.456.789-01"),
            Some(("123.456.789-01".into(), IdentifierSource::Cpf))
        );
    }

    #[test]
    fn test_cnpj_formats() {
        assert_eq!(
            source_of("Pagamento Pix ACME LTDA 12.345.678/0001-99"),
            Some(("12.345.678/0001-99".into(), IdentifierSource::Cnpj))
        );
        assert_eq!(
            source_of("Boleto 12345678000199 ACME"),
            Some(("12345678000199".into(), IdentifierSource::Cnpj))
        );
    }

    #[test]
    fn test_trailing_digit_run_keeps_last_six() {
        assert_eq!(
            source_of("DEB AUTOMATICO 1234 CONTA 98765432100"),
            Some(("432100".into(), IdentifierSource::DigitRun))
        );
        assert_eq!(source_of("TARIFA 12345"), None);
    }

    #[test]
    fn test_longer_digit_run_is_not_a_cnpj() {
        assert_eq!(
            source_of("COD 1234567800019912345"),
            Some(("912345".into(), IdentifierSource::DigitRun))
        );
    }

    #[test]
    fn test_payee_from_favored() {
        assert_eq!(
            extract_payee("TED FAV.: ANA SOUZA Transferencia enviada").as_deref(),
            Some("ANA SOUZA")
        );
        assert_eq!(extract_payee("fav.: ACME LTDA").as_deref(), Some("ACME LTDA"));
    }

    #[test]
    fn test_payee_from_pix() {
        assert_eq!(
            extract_payee("Recebimento Pix ANA SOUZA ***.123.456-**").as_deref(),
            Some("ANA SOUZA")
        );
        assert_eq!(
            extract_payee("Pagamento Pix ACME LTDA").as_deref(),
            Some("ACME LTDA")
        );
        assert_eq!(extract_payee("TARIFA BANCARIA"), None);
    }

    #[test]
    fn test_ted_code() {
        assert_eq!(
            extract_ted_code("TED CODIGO TED: AB12CD FAV.: ANA").as_deref(),
            Some("AB12CD")
        );
        assert_eq!(extract_ted_code("Pix"), None);
    }

    #[test]
    fn test_scan_combines_everything() {
        let details = scan("Pagamento Pix ANA SOUZA ***.123.456-**");
        assert_eq!(details.payee_name.as_deref(), Some("ANA SOUZA"));
        assert_eq!(
            details.identifier.map(|id| id.source),
            Some(IdentifierSource::MaskedCpf)
        );
        assert!(details.ted_code.is_none());
    }
}
