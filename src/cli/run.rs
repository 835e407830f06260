//! Reconciliation run command

use std::path::PathBuf;

use clap::Args;

use crate::config::Settings;
use crate::error::ReconResult;
use crate::services::{Pipeline, RegistryClient, ReconciliationSummary};
use crate::storage::Storage;

/// Arguments for `run`
#[derive(Args)]
pub struct RunArgs {
    /// Transactions JSON from the statement parser (default: data/transactions.json)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Where to write reconciled transactions (default: output/reconciled_transactions.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Handle the run command
pub fn handle_run_command(storage: &Storage, settings: &Settings, args: RunArgs) -> ReconResult<()> {
    let client = RegistryClient::from_settings(storage.cache.clone(), &settings.registry)?;

    let mut pipeline = Pipeline::new(storage, settings);
    if let Some(input) = args.input {
        pipeline = pipeline.with_input(input);
    }
    if let Some(output) = args.output {
        pipeline = pipeline.with_output(output);
    }

    let summary = pipeline.run(&client)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!();
        println!("Reconciled transactions: {}", pipeline.output().display());
        println!(
            "Candidate links:         {}",
            storage.paths().links_csv_file().display()
        );
    }

    Ok(())
}

fn print_summary(summary: &ReconciliationSummary) {
    println!("Reconciliation Summary");
    println!("{}", "=".repeat(40));
    println!("Transactions:           {:>6}", summary.transactions);

    if let Some(report) = &summary.aliases {
        println!(
            "Aliases:                {:>6} added, {} skipped, {} invalid, {} conflicts",
            report.added,
            report.skipped,
            report.invalid,
            report.conflicts.len()
        );
    }

    println!(
        "First pass:             {:>6} attached, {} without candidate",
        summary.first_pass.attached, summary.first_pass.no_candidate
    );
    println!(
        "Registry lookups:       {:>6} requested ({} cached, {} fetched, {} failed)",
        summary.lookups.requested,
        summary.lookups.from_cache,
        summary.lookups.fetched,
        summary.lookups.failed
    );
    println!("Candidate links:        {:>6}", summary.links);
    println!(
        "Directory changes:      {:>6} enriched, {} created",
        summary.enriched, summary.created
    );
    println!(
        "Second pass:            {:>6} attached ({} new), {} without candidate",
        summary.second_pass.attached,
        summary.newly_attached(),
        summary.second_pass.no_candidate
    );
}
