//! Reconciliation engine
//!
//! Walks each transaction through extraction, candidate search and
//! attachment against a directory snapshot:
//!
//! 1. Fill in the identifier, payee name and TED code from the description
//!    when the statement parser left them empty.
//! 2. Look the identifier up by exact, suffix or substring match. With a
//!    payee name, each candidate must also pass the name check; without one,
//!    every identifier match is accepted.
//! 3. Attach the first surviving candidate in directory order, or mark the
//!    transaction as having no candidate.
//!
//! Full company identifiers left without a contact are collected for a
//! registry lookup, once per identifier per run.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use super::directory::{ContactDirectory, IdentifierMatch};
use super::extractor;
use super::normalizer::{is_masked, is_valid_company, normalize, IdentifierKind, COMPANY_WIDTH};
use super::tokenizer::NameMatcher;
use crate::models::{Contact, MatchStatus, Transaction};

/// Digits dropped from the end of a masked CPF's visible run on retry
const MASKED_FALLBACK_TRIM: usize = 2;

/// Counts for one engine pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    pub attached: usize,
    pub no_candidate: usize,
    /// Company identifiers to look up, first-seen order, no repeats
    pub lookup_queue: Vec<String>,
}

/// Matches transactions against one directory snapshot
pub struct ReconciliationEngine<'a> {
    directory: &'a ContactDirectory,
    matcher: NameMatcher,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(directory: &'a ContactDirectory, matcher: NameMatcher) -> Self {
        Self { directory, matcher }
    }

    /// Reconcile every transaction in place
    pub fn run(&self, transactions: &mut [Transaction]) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        let mut queued = HashSet::new();

        for transaction in transactions.iter_mut() {
            let lookup = self.reconcile(transaction);
            match transaction.match_status {
                MatchStatus::Attached => outcome.attached += 1,
                _ => outcome.no_candidate += 1,
            }
            if let Some(tax_id) = lookup {
                if queued.insert(tax_id.clone()) {
                    outcome.lookup_queue.push(tax_id);
                }
            }
        }

        info!(
            transactions = transactions.len(),
            attached = outcome.attached,
            no_candidate = outcome.no_candidate,
            queued = outcome.lookup_queue.len(),
            "Reconciliation pass complete"
        );
        outcome
    }

    /// Reconcile one transaction in place
    ///
    /// Returns the company identifier to look up when the transaction carries
    /// a full, valid company id and nothing matched.
    pub fn reconcile(&self, transaction: &mut Transaction) -> Option<String> {
        transaction.clear_match();
        fill_from_description(transaction);

        let digits = normalize(&transaction.partial_identifier);
        if digits.is_empty() {
            transaction.match_status = MatchStatus::NoCandidate;
            return None;
        }

        let mut found = self.candidates(&digits, &transaction.payee_name);
        if found.is_empty() && is_masked(&transaction.partial_identifier) {
            if let Some(window) = masked_window(&digits) {
                debug!(
                    visible = %digits,
                    window = %window,
                    "Retrying masked identifier with shorter window"
                );
                found = self.candidates(window, &transaction.payee_name);
            }
        }

        match found.first() {
            Some(best) => {
                transaction.contact = Some(best.contact.clone());
                transaction.match_method = Some(best.method);
                transaction.match_status = MatchStatus::Attached;
                transaction.matched_contacts =
                    found.iter().map(|m| m.contact.clone()).collect();
                None
            }
            None => {
                transaction.match_status = MatchStatus::NoCandidate;
                (digits.len() == COMPANY_WIDTH && is_valid_company(&digits)).then_some(digits)
            }
        }
    }

    /// Identifier matches that also pass the name check
    fn candidates(&self, digits: &str, payee_name: &str) -> Vec<IdentifierMatch<'a>> {
        let matches = self.directory.find_by_exact_or_suffix(digits);
        if payee_name.trim().is_empty() {
            return matches;
        }

        let payee = self.matcher.tokenize(payee_name);
        matches
            .into_iter()
            .filter(|m| {
                let kind = contact_kind(m.contact);
                m.contact.names().any(|name| {
                    self.matcher
                        .tokens_match(&payee, &self.matcher.tokenize(name), kind)
                })
            })
            .collect()
    }
}

/// Name policy follows the width of the contact's own identifier
fn contact_kind(contact: &Contact) -> IdentifierKind {
    match contact.tax_id.as_deref().map(str::len) {
        Some(COMPANY_WIDTH) => IdentifierKind::Company,
        _ => IdentifierKind::Person,
    }
}

/// Visible run of a masked CPF without its last digits
fn masked_window(digits: &str) -> Option<&str> {
    let end = digits.len().checked_sub(MASKED_FALLBACK_TRIM)?;
    (end > 0).then(|| &digits[..end])
}

/// Fill empty identifier, payee and TED fields from the description
fn fill_from_description(transaction: &mut Transaction) {
    let needs_identifier = transaction.partial_identifier.trim().is_empty();
    let needs_payee = transaction.payee_name.trim().is_empty();
    if !needs_identifier && !needs_payee && transaction.ted_code.is_some() {
        return;
    }

    let details = extractor::scan(&transaction.description);
    if needs_identifier {
        if let Some(identifier) = details.identifier {
            transaction.partial_identifier = identifier.raw;
        }
    }
    if needs_payee {
        if let Some(payee) = details.payee_name {
            transaction.payee_name = payee;
        }
    }
    if transaction.ted_code.is_none() {
        transaction.ted_code = details.ted_code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchMethod, Money};
    use chrono::NaiveDate;

    fn transaction(identifier: &str, payee: &str) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        Transaction::new(date, "PIX", Money::from_cents(-10_000)).with_party(identifier, payee)
    }

    fn contact(tax_id: &str, name: &str) -> Contact {
        Contact::new(Some(tax_id.to_string()), name)
    }

    fn engine(directory: &ContactDirectory) -> ReconciliationEngine<'_> {
        ReconciliationEngine::new(directory, NameMatcher::default())
    }

    #[test]
    fn test_masked_cpf_attaches_through_fallback_window() {
        let directory = ContactDirectory::new(vec![contact("00000012345", "Ana Souza")]);
        let mut tx = transaction("***.123.456-**", "Ana Souza");

        let lookup = engine(&directory).reconcile(&mut tx);

        assert!(lookup.is_none());
        assert_eq!(tx.match_status, MatchStatus::Attached);
        assert_eq!(tx.contact.as_ref().unwrap().display_name, "Ana Souza");
        assert_eq!(tx.match_method, Some(MatchMethod::Substring));
    }

    #[test]
    fn test_name_gate_rejects_other_person() {
        let directory = ContactDirectory::new(vec![contact("98712345601", "Carlos Pereira")]);
        let mut tx = transaction("***.123.456-**", "Ana Souza");

        engine(&directory).reconcile(&mut tx);

        assert_eq!(tx.match_status, MatchStatus::NoCandidate);
        assert!(tx.contact.is_none());
        assert!(tx.matched_contacts.is_empty());
    }

    #[test]
    fn test_without_payee_any_identifier_match_is_accepted() {
        let directory = ContactDirectory::new(vec![
            contact("98712345601", "Carlos Pereira"),
            contact("11112345622", "Maria Lima"),
        ]);
        let mut tx = transaction("***.123.456-**", "");

        engine(&directory).reconcile(&mut tx);

        assert_eq!(tx.matched_contacts.len(), 2);
        assert_eq!(tx.contact.as_ref().unwrap().display_name, "Carlos Pereira");
    }

    #[test]
    fn test_first_match_wins_in_directory_order() {
        let directory = ContactDirectory::new(vec![
            contact("11111234500", "Ana Souza Lima"),
            contact("00000234500", "Ana Souza"),
        ]);
        let mut tx = transaction("234500", "ANA SOUZA");

        engine(&directory).reconcile(&mut tx);

        assert_eq!(tx.matched_contacts.len(), 2);
        assert_eq!(tx.contact.as_ref().unwrap().display_name, "Ana Souza Lima");
    }

    #[test]
    fn test_unknown_company_is_queued_once() {
        let directory = ContactDirectory::new(vec![contact("12345678901", "Ana Souza")]);
        let mut transactions: Vec<Transaction> = (0..5)
            .map(|_| transaction("12.345.678/0001-99", "ACME COMERCIO LTDA"))
            .collect();
        transactions.push(transaction("00000000000000", "Nobody"));

        let outcome = engine(&directory).run(&mut transactions);

        assert_eq!(outcome.lookup_queue, vec!["12345678000199".to_string()]);
        assert_eq!(outcome.no_candidate, 6);
        assert_eq!(outcome.attached, 0);
    }

    #[test]
    fn test_known_company_is_not_queued() {
        let directory =
            ContactDirectory::new(vec![contact("12345678000199", "ACME COMERCIO LTDA")]);
        let mut transactions = vec![transaction("12.345.678/0001-99", "Acme Comercio")];

        let outcome = engine(&directory).run(&mut transactions);

        assert!(outcome.lookup_queue.is_empty());
        assert_eq!(transactions[0].match_method, Some(MatchMethod::Exact));
    }

    #[test]
    fn test_fields_extracted_from_description() {
        let directory = ContactDirectory::new(vec![contact("00000012345", "Ana Souza")]);
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut tx = Transaction::new(
            date,
            "Pagamento Pix ANA SOUZA ***.123.456-** CODIGO TED: X1",
            Money::from_cents(-500),
        );

        engine(&directory).reconcile(&mut tx);

        assert_eq!(tx.partial_identifier, "***.123.456-**");
        assert_eq!(tx.payee_name, "ANA SOUZA");
        assert_eq!(tx.ted_code.as_deref(), Some("X1"));
        assert!(tx.is_attached());
    }

    #[test]
    fn test_no_identifier_is_terminal() {
        let directory = ContactDirectory::new(vec![contact("12345678901", "Ana Souza")]);
        let mut tx = transaction("", "Ana Souza");

        assert!(engine(&directory).reconcile(&mut tx).is_none());
        assert_eq!(tx.match_status, MatchStatus::NoCandidate);
    }

    #[test]
    fn test_rerun_clears_previous_match() {
        let directory = ContactDirectory::new(vec![contact("00000012345", "Ana Souza")]);
        let empty = ContactDirectory::default();
        let mut tx = transaction("***.123.456-**", "Ana Souza");

        engine(&directory).reconcile(&mut tx);
        assert!(tx.is_attached());

        engine(&empty).reconcile(&mut tx);
        assert!(!tx.is_attached());
        assert_eq!(tx.match_status, MatchStatus::NoCandidate);
    }
}
