//! Candidate link report command

use crate::config::Settings;
use crate::error::ReconResult;
use crate::export::{write_links_csv, write_links_json};
use crate::models::CandidateLink;
use crate::services::{linking, ContactDirectory, NameMatcher};
use crate::storage::Storage;

/// Handle the links command
///
/// Re-runs discovery over the whole registry cache against the current
/// contacts, rewrites both link reports and prints the strongest links.
pub fn handle_links_command(storage: &Storage, settings: &Settings, limit: usize) -> ReconResult<()> {
    let directory = ContactDirectory::with_min_partial_digits(
        storage.contacts.load()?,
        settings.matching.min_partial_digits,
    );
    let records = storage.cache.entries()?;
    let matcher = NameMatcher::from_settings(&settings.matching);
    let links = linking::discover(&records, &directory, &matcher, settings.linking.min_tokens);

    let paths = storage.paths();
    write_links_csv(&paths.links_csv_file(), &links)?;
    write_links_json(&paths.links_json_file(), &links)?;

    if links.is_empty() {
        println!(
            "No candidate links across {} cached companies.",
            records.iter().filter(|r| r.is_ok()).count()
        );
        return Ok(());
    }

    print!("{}", format_links(&links, limit));
    println!();
    println!("Report written to {}", paths.links_csv_file().display());
    Ok(())
}

/// Table of the strongest links, strongest first
pub fn format_links(links: &[CandidateLink], limit: usize) -> String {
    let mut sorted: Vec<&CandidateLink> = links.iter().collect();
    sorted.sort_by(|a, b| b.strength.cmp(&a.strength));

    let mut output = format!(
        "{:<16} {:<32} {:<10} {:<30} {:>3}\n",
        "CNPJ", "Registry name", "Type", "Contact", "Str"
    );
    output.push_str(&format!("{}\n", "-".repeat(95)));

    for link in sorted.iter().take(limit) {
        output.push_str(&format!(
            "{:<16} {:<32} {:<10} {:<30} {:>3}\n",
            link.source_tax_id,
            truncate(&link.source_name, 32),
            link.link_type.to_string(),
            truncate(&link.matched_contact, 30),
            link.strength
        ));
    }

    if links.len() > limit {
        output.push_str(&format!("... and {} more\n", links.len() - limit));
    }
    output
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
