//! Name tokenization and token-set matching
//!
//! Names are compared as sets of significant words: accents folded away,
//! punctuation dropped, lower-cased, short words discarded. Word order and
//! repetition never matter.

use std::collections::BTreeSet;

use unicode_normalization::UnicodeNormalization;

use super::normalizer::IdentifierKind;
use crate::config::{CompanyNamePolicy, MatchingSettings};

/// A set of normalized name tokens, ordered for stable output
pub type TokenSet = BTreeSet<String>;

/// Splits free text into significant tokens
#[derive(Debug, Clone, Copy)]
pub struct NameTokenizer {
    min_token_length: usize,
}

impl Default for NameTokenizer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl NameTokenizer {
    /// Tokens of `min_token_length` characters or fewer are discarded
    pub fn new(min_token_length: usize) -> Self {
        Self { min_token_length }
    }

    /// Fold a name to lower-case ASCII without punctuation
    ///
    /// Decomposes to NFKD and keeps only ASCII, so "João" becomes "joao".
    /// Punctuation is removed without inserting a space ("D'ÁVILA" becomes
    /// "davila").
    pub fn fold(&self, name: &str) -> String {
        name.nfkd()
            .filter(|c| c.is_ascii())
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_ascii_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// Significant tokens of a name
    pub fn tokenize(&self, name: &str) -> TokenSet {
        self.fold(name)
            .split_whitespace()
            .filter(|token| token.chars().count() > self.min_token_length)
            .map(str::to_string)
            .collect()
    }
}

/// Number of tokens the two sets share
pub fn token_overlap(a: &TokenSet, b: &TokenSet) -> usize {
    a.intersection(b).count()
}

/// Decides whether two names refer to the same party
#[derive(Debug, Clone)]
pub struct NameMatcher {
    tokenizer: NameTokenizer,
    person_min_overlap: usize,
    company_min_overlap: usize,
    company_policy: CompanyNamePolicy,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::from_settings(&MatchingSettings::default())
    }
}

impl NameMatcher {
    /// Build a matcher from the matching settings
    pub fn from_settings(settings: &MatchingSettings) -> Self {
        Self {
            tokenizer: NameTokenizer::new(settings.min_token_length),
            person_min_overlap: settings.person_min_overlap,
            company_min_overlap: settings.company_min_overlap,
            company_policy: settings.company_policy,
        }
    }

    /// The tokenizer this matcher uses
    pub fn tokenizer(&self) -> &NameTokenizer {
        &self.tokenizer
    }

    /// Tokenize with this matcher's settings
    pub fn tokenize(&self, name: &str) -> TokenSet {
        self.tokenizer.tokenize(name)
    }

    /// Compare two raw names
    pub fn names_match(&self, a: &str, b: &str, kind: IdentifierKind) -> bool {
        self.tokens_match(&self.tokenize(a), &self.tokenize(b), kind)
    }

    /// Compare two token sets
    ///
    /// `candidate` is the name found on the statement or in the registry;
    /// `known` is the directory side. The distinction only matters for the
    /// short-name subset policy.
    pub fn tokens_match(&self, candidate: &TokenSet, known: &TokenSet, kind: IdentifierKind) -> bool {
        let overlap = token_overlap(candidate, known);
        match kind {
            IdentifierKind::Person => overlap >= self.person_min_overlap,
            IdentifierKind::Company => match self.company_policy {
                CompanyNamePolicy::TokenOverlap => overlap >= self.company_min_overlap,
                CompanyNamePolicy::ShortNameSubset => {
                    if candidate.len() <= 2 {
                        !candidate.is_empty() && candidate.is_subset(known)
                    } else {
                        overlap >= self.company_min_overlap
                    }
                }
            },
            IdentifierKind::Invalid => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> TokenSet {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tokenize_folds_accents_and_case() {
        let tokenizer = NameTokenizer::default();
        assert_eq!(
            tokenizer.tokenize("JOÃO da Conceição"),
            set(&["joao", "conceicao"])
        );
    }

    #[test]
    fn test_tokenize_drops_punctuation_and_short_words() {
        let tokenizer = NameTokenizer::default();
        assert_eq!(
            tokenizer.tokenize("ACME Comércio & Serviços LTDA. - ME"),
            set(&["acme", "comercio", "servicos", "ltda"])
        );
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("de da do").is_empty());
    }

    #[test]
    fn test_configurable_min_length() {
        let tokenizer = NameTokenizer::new(3);
        assert_eq!(tokenizer.tokenize("Ana Souza"), set(&["souza"]));
    }

    #[test]
    fn test_overlap() {
        assert_eq!(token_overlap(&set(&["ana", "souza"]), &set(&["souza", "ana", "lima"])), 2);
        assert_eq!(token_overlap(&set(&[]), &set(&["ana"])), 0);
    }

    #[test]
    fn test_person_requires_two_tokens() {
        let matcher = NameMatcher::default();
        assert!(matcher.names_match("Ana Souza", "ANA MARIA SOUZA", IdentifierKind::Person));
        assert!(!matcher.names_match("Ana Lima", "Ana Souza", IdentifierKind::Person));
        assert!(!matcher.names_match("Ana Souza", "Ana Souza", IdentifierKind::Invalid));
    }

    #[test]
    fn test_company_overlap_policy() {
        let matcher = NameMatcher::default();
        assert!(matcher.names_match(
            "ACME COMERCIO LTDA",
            "Acme Comércio de Peças",
            IdentifierKind::Company
        ));
        assert!(!matcher.names_match("ACME", "ACME COMERCIO", IdentifierKind::Company));
    }

    #[test]
    fn test_company_short_name_subset_policy() {
        let settings = MatchingSettings {
            company_policy: CompanyNamePolicy::ShortNameSubset,
            ..MatchingSettings::default()
        };
        let matcher = NameMatcher::from_settings(&settings);

        assert!(matcher.names_match("ACME", "ACME COMERCIO", IdentifierKind::Company));
        assert!(!matcher.names_match("ACME PECAS", "ACME COMERCIO", IdentifierKind::Company));
        assert!(matcher.names_match(
            "ACME COMERCIO PECAS",
            "ACME COMERCIO",
            IdentifierKind::Company
        ));
    }
}
