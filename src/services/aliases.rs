//! Alias integration
//!
//! The alias file is a hand-maintained `name; tax_id` list for people the
//! contact export does not know (or knows without an identifier).

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::directory::ContactDirectory;
use super::normalizer::canonical;
use super::tokenizer::NameTokenizer;
use crate::models::{AliasConflict, AliasEntry, Contact, ContactChange, IntegrationReport};

/// Name key used to compare alias and contact names
fn name_key(tokenizer: &NameTokenizer, name: &str) -> String {
    tokenizer
        .fold(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Add a minimal contact for every alias whose tax_id is unknown
///
/// Aliases whose tax_id is already in the directory are skipped. When the
/// alias name differs from every name of that contact the disagreement is
/// logged and reported, and the existing contact is kept as is. Running this
/// twice with the same aliases changes nothing the second time.
pub fn integrate(
    aliases: &[AliasEntry],
    directory: &ContactDirectory,
) -> (ContactDirectory, IntegrationReport) {
    let tokenizer = NameTokenizer::default();
    let mut contacts = directory.contacts().to_vec();
    let mut index: HashMap<String, usize> = contacts
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.tax_id.clone().map(|id| (id, i)))
        .collect();
    let mut report = IntegrationReport::default();

    for alias in aliases {
        let name = alias.name.trim();
        let Some(tax_id) = canonical(&alias.tax_id).filter(|_| !name.is_empty()) else {
            debug!(name = %alias.name, tax_id = %alias.tax_id, "Ignoring unusable alias");
            report.invalid += 1;
            continue;
        };

        match index.get(&tax_id) {
            Some(&i) => {
                let existing = &contacts[i];
                let key = name_key(&tokenizer, name);
                let agrees = existing
                    .names()
                    .any(|known| name_key(&tokenizer, known) == key);
                if !agrees {
                    warn!(
                        tax_id = %tax_id,
                        existing = %existing.best_name(),
                        alias = %name,
                        "Alias name conflicts with existing contact; keeping existing"
                    );
                    report.conflicts.push(AliasConflict {
                        tax_id: tax_id.clone(),
                        existing_name: existing.best_name().to_string(),
                        alias_name: name.to_string(),
                    });
                }
                report.skipped += 1;
            }
            None => {
                info!(tax_id = %tax_id, name = %name, "Adding contact from alias");
                let mut contact = Contact::new(Some(tax_id.clone()), name);
                contact.legal_name = name.to_string();
                index.insert(tax_id, contacts.len());
                report.changes.push(ContactChange::Created(contact.clone()));
                contacts.push(contact);
                report.added += 1;
            }
        }
    }

    (directory.rebuild(contacts), report)
}

/// Set the tax_id of existing contacts from aliases with the same name
///
/// Names are compared after accent folding, lower-casing and whitespace
/// collapsing. When the alias file lists a name twice the last row wins.
pub fn backfill(
    aliases: &[AliasEntry],
    directory: &ContactDirectory,
) -> (ContactDirectory, IntegrationReport) {
    let tokenizer = NameTokenizer::default();
    let mut report = IntegrationReport::default();
    let mut by_name: HashMap<String, String> = HashMap::new();

    for alias in aliases {
        let key = name_key(&tokenizer, &alias.name);
        match canonical(&alias.tax_id) {
            Some(tax_id) if !key.is_empty() => {
                by_name.insert(key, tax_id);
            }
            _ => report.invalid += 1,
        }
    }

    let contacts: Vec<Contact> = directory
        .contacts()
        .iter()
        .map(|contact| {
            let key = name_key(&tokenizer, &contact.display_name);
            match by_name.get(&key) {
                Some(tax_id) if contact.tax_id.as_deref() != Some(tax_id.as_str()) => {
                    let mut updated = contact.clone();
                    updated.tax_id = Some(tax_id.clone());
                    updated.raw_tax_id = None;
                    info!(
                        name = %contact.display_name,
                        from = %contact.tax_id_str(),
                        to = %tax_id,
                        "Backfilling contact tax_id from alias"
                    );
                    report.updated += 1;
                    report.changes.push(ContactChange::Updated {
                        before: contact.clone(),
                        after: updated.clone(),
                    });
                    updated
                }
                Some(_) => {
                    report.skipped += 1;
                    contact.clone()
                }
                None => contact.clone(),
            }
        })
        .collect();

    (directory.rebuild(contacts), report)
}
