//! Registry cache commands

use clap::Subcommand;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::error::ReconResult;
use crate::storage::Storage;

/// Cache subcommands
#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached companies
    Show {
        /// Print the raw cache entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move the cache aside and start with an empty one
    Reset,
}

/// Handle a cache command
pub fn handle_cache_command(storage: &Storage, cmd: CacheCommands) -> ReconResult<()> {
    let cache = &storage.cache;

    match cmd {
        CacheCommands::Show { json } => {
            let records = cache.entries()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            println!("Cache: {}", cache.path().display());
            if records.is_empty() {
                println!("No cached companies.");
                return Ok(());
            }

            println!();
            println!("{:<16} {:<40} {:>8}", "CNPJ", "Legal name", "Partners");
            println!("{}", "-".repeat(66));
            for record in &records {
                println!(
                    "{:<16} {:<40} {:>8}",
                    record.tax_id,
                    record.company_name(),
                    record.partners.len()
                );
            }
            println!();
            println!("{} cached companies", records.len());
        }
        CacheCommands::Reset => {
            let backup = cache.reset()?;
            let backup_name = backup.as_ref().map(|p| p.display().to_string());

            AuditLogger::new(storage.paths().audit_log()).log(&AuditEntry::reset(
                EntityType::RegistryCache,
                cache.path().display().to_string(),
                "cli",
                backup_name.clone(),
            ))?;

            match backup_name {
                Some(name) => println!("Registry cache reset. Previous cache kept at {}", name),
                None => println!("Registry cache reset."),
            }
        }
    }

    Ok(())
}
