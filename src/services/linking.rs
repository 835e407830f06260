//! Registry cross-linking
//!
//! Two ways registry data flows back into the directory:
//!
//! - [`discover`] proposes [`CandidateLink`]s between a company (its legal
//!   name, trade name or partners) and contacts with similar names. Links are
//!   exported for review and never applied automatically.
//! - [`enrich`] copies registry data onto the contact holding the exact same
//!   tax_id, and optionally creates contacts for companies not yet known.

use tracing::{debug, info};

use super::directory::ContactDirectory;
use super::normalizer::IdentifierKind;
use super::tokenizer::NameMatcher;
use crate::config::LinkingSettings;
use crate::models::{CandidateLink, Contact, ContactChange, LinkType, RegistryRecord};

/// Propose links between registry names and directory contacts
///
/// Scans the legal name, the trade name and every partner name of each
/// successful record against all names of every contact. A contact is
/// linked when at least `min_tokens` tokens are shared; the overlap is kept
/// as the link strength. The company's own contact is never linked to it.
pub fn discover(
    records: &[RegistryRecord],
    directory: &ContactDirectory,
    matcher: &NameMatcher,
    min_tokens: usize,
) -> Vec<CandidateLink> {
    let mut links = Vec::new();

    for record in records.iter().filter(|r| r.is_ok()) {
        let mut sources: Vec<(&str, LinkType)> = Vec::new();
        if !record.legal_name.trim().is_empty() {
            sources.push((record.legal_name.as_str(), LinkType::LegalName));
        }
        if !record.trade_name.trim().is_empty() {
            sources.push((record.trade_name.as_str(), LinkType::TradeName));
        }
        sources.extend(
            record
                .partners
                .iter()
                .filter(|p| !p.name.trim().is_empty())
                .map(|p| (p.name.as_str(), LinkType::Partner)),
        );

        for (source_name, link_type) in sources {
            let tokens = matcher.tokenize(source_name);
            for found in directory.find_by_name(&tokens, IdentifierKind::Invalid, min_tokens, matcher) {
                if found.contact.tax_id.as_deref() == Some(record.tax_id.as_str()) {
                    continue;
                }
                debug!(
                    tax_id = %record.tax_id,
                    source = %source_name,
                    contact = %found.contact.best_name(),
                    strength = found.overlap,
                    "Candidate link"
                );
                links.push(CandidateLink {
                    source_tax_id: record.tax_id.clone(),
                    source_name: source_name.to_string(),
                    company_name: record.company_name().to_string(),
                    matched_contact: found.contact.best_name().to_string(),
                    matched_tax_id: found.contact.tax_id_str().to_string(),
                    link_type,
                    strength: found.overlap,
                });
            }
        }
    }

    info!(
        records = records.len(),
        links = links.len(),
        "Link discovery complete"
    );
    links
}

/// Copy registry data onto contacts with the same tax_id
///
/// The matching contact gets its legal name, trade name and partners
/// replaced by the registry's. When `create_missing_companies` is set, a
/// successful record with no contact becomes a new contact named after the
/// company. Failed records are ignored.
pub fn enrich(
    records: &[RegistryRecord],
    directory: &ContactDirectory,
    settings: &LinkingSettings,
) -> (ContactDirectory, Vec<ContactChange>) {
    let mut contacts: Vec<Contact> = directory.contacts().to_vec();
    let mut changes = Vec::new();

    for record in records.iter().filter(|r| r.is_ok()) {
        let position = contacts
            .iter()
            .position(|c| c.tax_id.as_deref() == Some(record.tax_id.as_str()));

        match position {
            Some(index) => {
                let before = contacts[index].clone();
                let contact = &mut contacts[index];
                contact.legal_name = record.legal_name.clone();
                contact.trade_name = record.trade_name.clone();
                contact.partners = record.partners.clone();
                contact.raw_partners = None;
                if *contact != before {
                    info!(tax_id = %record.tax_id, "Enriched contact from registry");
                    changes.push(ContactChange::Updated {
                        before,
                        after: contact.clone(),
                    });
                }
            }
            None if settings.create_missing_companies => {
                let mut contact =
                    Contact::new(Some(record.tax_id.clone()), record.company_name());
                contact.legal_name = record.legal_name.clone();
                contact.trade_name = record.trade_name.clone();
                contact.partners = record.partners.clone();
                info!(
                    tax_id = %record.tax_id,
                    name = %contact.display_name,
                    "Created contact from registry"
                );
                changes.push(ContactChange::Created(contact.clone()));
                contacts.push(contact);
            }
            None => {}
        }
    }

    (directory.rebuild(contacts), changes)
}
