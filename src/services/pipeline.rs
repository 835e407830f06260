//! End-to-end reconciliation run
//!
//! Wires the pieces together in a fixed order: aliases, first pass, registry
//! resolution, link discovery, enrichment, second pass. Each stage persists
//! what it produced before the next one starts, so an interrupted run leaves
//! usable files behind.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, info_span};

use super::aliases;
use super::directory::ContactDirectory;
use super::linking;
use super::reconciliation::{PassOutcome, ReconciliationEngine};
use super::registry::RegistryClient;
use super::tokenizer::NameMatcher;
use crate::audit::AuditLogger;
use crate::config::Settings;
use crate::error::ReconResult;
use crate::export::{write_links_csv, write_links_json, write_transactions_csv};
use crate::models::{ContactChange, IntegrationReport};
use crate::storage::{Storage, TransactionRepository};

/// Registry side of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupSummary {
    /// Distinct company identifiers sent to the client
    pub requested: usize,
    pub from_cache: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub transactions: usize,
    /// Alias integration report, when an alias file was present
    pub aliases: Option<IntegrationReport>,
    pub first_pass: PassOutcome,
    pub lookups: LookupSummary,
    /// Candidate links written for review
    pub links: usize,
    /// Contacts updated from registry data
    pub enriched: usize,
    /// Contacts created from registry data
    pub created: usize,
    pub second_pass: PassOutcome,
}

impl ReconciliationSummary {
    /// Transactions attached by the second pass that the first pass missed
    pub fn newly_attached(&self) -> usize {
        self.second_pass
            .attached
            .saturating_sub(self.first_pass.attached)
    }
}

/// Runs a full reconciliation against one storage root
pub struct Pipeline<'a> {
    storage: &'a Storage,
    settings: &'a Settings,
    audit: AuditLogger,
    input: PathBuf,
    output: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Pipeline reading and writing the default files under `storage`
    pub fn new(storage: &'a Storage, settings: &'a Settings) -> Self {
        let paths = storage.paths();
        Self {
            storage,
            settings,
            audit: AuditLogger::new(paths.audit_log()),
            input: paths.transactions_file(),
            output: paths.reconciled_file(),
        }
    }

    /// Read transactions from another file
    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self
    }

    /// Write reconciled transactions to another file
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Where reconciled transactions end up
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run every stage to completion
    ///
    /// Only storage, configuration and input-format problems fail the run.
    /// Unmatched transactions and failed lookups are reported in the summary.
    pub fn run(&self, client: &RegistryClient) -> ReconResult<ReconciliationSummary> {
        let mut summary = ReconciliationSummary::default();
        let matcher = NameMatcher::from_settings(&self.settings.matching);
        let paths = self.storage.paths();

        let contacts = self.storage.contacts.load()?;
        let mut directory = ContactDirectory::with_min_partial_digits(
            contacts,
            self.settings.matching.min_partial_digits,
        );
        info!(contacts = directory.len(), "Contact directory loaded");

        if self.storage.aliases.exists() {
            let _span = info_span!("aliases").entered();
            let entries = self.storage.aliases.load()?;
            let (integrated, report) = aliases::integrate(&entries, &directory);
            if report.changed() {
                self.storage.contacts.save(integrated.contacts())?;
                self.audit.log_changes(&report.changes, "alias_integration")?;
            }
            directory = integrated;
            summary.aliases = Some(report);
        }

        let mut transactions = TransactionRepository::new(&self.input).load()?;
        summary.transactions = transactions.len();

        summary.first_pass = {
            let _span = info_span!("first_pass").entered();
            ReconciliationEngine::new(&directory, matcher.clone()).run(&mut transactions)
        };

        let batch = {
            let _span = info_span!("registry").entered();
            client.lookup_batch(
                &summary.first_pass.lookup_queue,
                self.settings.registry.inter_call_delay(),
            )?
        };
        summary.lookups = LookupSummary {
            requested: batch.records.len(),
            from_cache: batch.from_cache,
            fetched: batch.fetched,
            failed: batch.failed,
        };

        // Discovery covers everything ever cached, not only this run's lookups
        let cached = client.cache().entries()?;
        let links = linking::discover(
            &cached,
            &directory,
            &matcher,
            self.settings.linking.min_tokens,
        );
        write_links_csv(&paths.links_csv_file(), &links)?;
        write_links_json(&paths.links_json_file(), &links)?;
        summary.links = links.len();

        let (enriched, changes) = linking::enrich(&cached, &directory, &self.settings.linking);
        if !changes.is_empty() {
            self.storage.contacts.save(enriched.contacts())?;
            self.audit.log_changes(&changes, "enrichment")?;
        }
        for change in &changes {
            match change {
                ContactChange::Created(_) => summary.created += 1,
                ContactChange::Updated { .. } => summary.enriched += 1,
            }
        }

        summary.second_pass = {
            let _span = info_span!("second_pass").entered();
            ReconciliationEngine::new(&enriched, matcher).run(&mut transactions)
        };

        TransactionRepository::new(&self.output).save(&transactions)?;
        write_transactions_csv(&paths.reconciled_csv_file(), &transactions)?;

        info!(
            transactions = summary.transactions,
            attached = summary.second_pass.attached,
            newly_attached = summary.newly_attached(),
            links = summary.links,
            output = %self.output.display(),
            "Reconciliation run complete"
        );
        Ok(summary)
    }
}
