//! Contact directory
//!
//! A read-only snapshot of the contact list, indexed by canonical tax
//! identifier. Alias integration and enrichment build a new directory rather
//! than mutating one in place.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::normalizer::{canonical, normalize, IdentifierKind};
use super::tokenizer::{token_overlap, NameMatcher, TokenSet};
use crate::config::settings::MIN_PARTIAL_DIGITS_FLOOR;
use crate::models::{Contact, MatchMethod};

/// Shortest partial identifier that may match by suffix or substring
pub const DEFAULT_MIN_PARTIAL_DIGITS: usize = 4;

/// A contact found by identifier, with how it matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierMatch<'a> {
    pub contact: &'a Contact,
    pub method: MatchMethod,
}

/// A contact found by name, with its best overlap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch<'a> {
    pub contact: &'a Contact,
    pub overlap: usize,
}

/// Contacts keyed by canonical tax identifier
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
    by_tax_id: HashMap<String, usize>,
    min_partial_digits: usize,
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ContactDirectory {
    /// Build a directory, canonicalizing identifiers and merging duplicates
    ///
    /// The first record for a tax_id keeps its position; later duplicates only
    /// fill in fields it does not know yet. Identifiers that cannot be
    /// canonicalized move to `raw_tax_id`: the contact stays out of the
    /// index and the text is written back as it was.
    pub fn new(contacts: impl IntoIterator<Item = Contact>) -> Self {
        Self::with_min_partial_digits(contacts, DEFAULT_MIN_PARTIAL_DIGITS)
    }

    /// Same as [`ContactDirectory::new`] with an explicit partial-match floor
    pub fn with_min_partial_digits(
        contacts: impl IntoIterator<Item = Contact>,
        min_partial_digits: usize,
    ) -> Self {
        let mut directory = Self {
            contacts: Vec::new(),
            by_tax_id: HashMap::new(),
            min_partial_digits: min_partial_digits.max(MIN_PARTIAL_DIGITS_FLOOR),
        };

        for mut contact in contacts {
            if let Some(raw) = contact.tax_id.take() {
                match canonical(&raw) {
                    Some(tax_id) => contact.tax_id = Some(tax_id),
                    None => {
                        warn!(tax_id = %raw, name = %contact.best_name(), "Contact identifier is not a CPF or CNPJ, leaving it unindexed");
                        contact.raw_tax_id = Some(raw);
                    }
                }
            }

            match contact.tax_id.clone() {
                Some(tax_id) => match directory.by_tax_id.get(&tax_id) {
                    Some(&index) => {
                        debug!(tax_id = %tax_id, "Merging duplicate contact");
                        directory.contacts[index].merge_missing(&contact);
                    }
                    None => {
                        directory.by_tax_id.insert(tax_id, directory.contacts.len());
                        directory.contacts.push(contact);
                    }
                },
                None => directory.contacts.push(contact),
            }
        }

        directory
    }

    /// Rebuild with the same partial-match floor
    pub fn rebuild(&self, contacts: impl IntoIterator<Item = Contact>) -> Self {
        Self::with_min_partial_digits(contacts, self.min_partial_digits)
    }

    /// Shortest partial identifier that may match
    pub fn min_partial_digits(&self) -> usize {
        self.min_partial_digits
    }

    /// Contact with exactly this identifier (normalized and padded first)
    pub fn get(&self, tax_id: &str) -> Option<&Contact> {
        let tax_id = canonical(tax_id)?;
        self.by_tax_id.get(&tax_id).map(|&i| &self.contacts[i])
    }

    /// Check whether a contact holds this identifier
    pub fn contains(&self, tax_id: &str) -> bool {
        self.get(tax_id).is_some()
    }

    /// All contacts in directory order
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Take the contacts out of the directory
    pub fn into_contacts(self) -> Vec<Contact> {
        self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Contacts whose identifier equals, ends with, or contains `digits`
    ///
    /// `digits` is used as given, without padding. Runs shorter than the
    /// partial-match floor only match exactly. Results keep directory order.
    pub fn find_by_exact_or_suffix(&self, digits: &str) -> Vec<IdentifierMatch<'_>> {
        let digits = normalize(digits);
        if digits.is_empty() {
            return Vec::new();
        }
        let allow_partial = digits.len() >= self.min_partial_digits;

        self.contacts
            .iter()
            .filter_map(|contact| {
                let tax_id = contact.tax_id.as_deref()?;
                let method = if tax_id == digits {
                    MatchMethod::Exact
                } else if allow_partial && tax_id.ends_with(&digits) {
                    MatchMethod::Suffix
                } else if allow_partial && tax_id.contains(&digits) {
                    MatchMethod::Substring
                } else {
                    return None;
                };
                Some(IdentifierMatch { contact, method })
            })
            .collect()
    }

    /// Contacts with at least `min_tokens` tokens in common with `tokens`
    ///
    /// Every name of a contact is tried and the best overlap kept. A person or
    /// company `kind` also applies the matcher's name policy to each name;
    /// `IdentifierKind::Invalid` compares overlap only.
    pub fn find_by_name(
        &self,
        tokens: &TokenSet,
        kind: IdentifierKind,
        min_tokens: usize,
        matcher: &NameMatcher,
    ) -> Vec<NameMatch<'_>> {
        if tokens.is_empty() {
            return Vec::new();
        }

        self.contacts
            .iter()
            .filter_map(|contact| {
                let overlap = contact
                    .names()
                    .map(|name| {
                        let known = matcher.tokenize(name);
                        let overlap = token_overlap(tokens, &known);
                        if kind == IdentifierKind::Invalid || matcher.tokens_match(tokens, &known, kind) {
                            overlap
                        } else {
                            0
                        }
                    })
                    .max()
                    .unwrap_or(0);
                (overlap >= min_tokens.max(1)).then_some(NameMatch { contact, overlap })
            })
            .collect()
    }
}
