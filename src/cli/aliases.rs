//! Alias file commands

use std::path::PathBuf;

use clap::Subcommand;

use crate::audit::AuditLogger;
use crate::config::Settings;
use crate::error::{ReconError, ReconResult};
use crate::models::IntegrationReport;
use crate::services::{aliases, ContactDirectory};
use crate::storage::{AliasRepository, Storage};

/// Alias subcommands
#[derive(Subcommand)]
pub enum AliasCommands {
    /// Add contacts for aliases whose tax_id is not in the directory
    Integrate {
        /// Alias file (default: data/aliases.csv)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Set the tax_id of existing contacts whose name matches an alias
    Backfill {
        /// Alias file (default: data/aliases.csv)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

/// Handle an alias command
pub fn handle_alias_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AliasCommands,
) -> ReconResult<()> {
    let (file, dry_run, backfill) = match cmd {
        AliasCommands::Integrate { file, dry_run } => (file, dry_run, false),
        AliasCommands::Backfill { file, dry_run } => (file, dry_run, true),
    };

    let repository = file.map(AliasRepository::new);
    let repository = repository.as_ref().unwrap_or(&storage.aliases);
    if !repository.exists() {
        return Err(ReconError::Validation(format!(
            "Alias file not found: {}",
            repository.path().display()
        )));
    }

    let entries = repository.load()?;
    let directory = ContactDirectory::with_min_partial_digits(
        storage.contacts.load()?,
        settings.matching.min_partial_digits,
    );

    let (updated, report, origin) = if backfill {
        let (updated, report) = aliases::backfill(&entries, &directory);
        (updated, report, "alias_backfill")
    } else {
        let (updated, report) = aliases::integrate(&entries, &directory);
        (updated, report, "alias_integration")
    };

    print_report(&report);

    if dry_run {
        println!();
        println!("Dry run: contacts not written.");
    } else if report.changed() {
        storage.contacts.save(updated.contacts())?;
        AuditLogger::new(storage.paths().audit_log()).log_changes(&report.changes, origin)?;
        println!();
        println!("Contacts saved: {}", storage.contacts.path().display());
    }

    Ok(())
}

fn print_report(report: &IntegrationReport) {
    println!("Added:     {}", report.added);
    println!("Updated:   {}", report.updated);
    println!("Skipped:   {}", report.skipped);
    println!("Invalid:   {}", report.invalid);

    if !report.conflicts.is_empty() {
        println!();
        println!("Conflicts (existing contact kept):");
        for conflict in &report.conflicts {
            println!(
                "  {}  contact: {}  alias: {}",
                conflict.tax_id, conflict.existing_name, conflict.alias_name
            );
        }
    }
}
