//! CSV export functionality
//!
//! `;`-separated, UTF-8 with BOM, so the files open directly in a Brazilian
//! spreadsheet locale.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{ReconError, ReconResult};
use crate::models::{CandidateLink, Transaction};
use crate::storage::file_io::{semicolon_writer, write_atomic, UTF8_BOM};

fn export_error(e: impl std::fmt::Display) -> ReconError {
    ReconError::Export(e.to_string())
}

/// Export candidate links to CSV
pub fn export_links_csv<W: Write>(links: &[CandidateLink], writer: &mut W) -> ReconResult<()> {
    writer.write_all(UTF8_BOM).map_err(export_error)?;
    let mut csv = semicolon_writer(writer);

    if links.is_empty() {
        csv.write_record([
            "source_tax_id",
            "source_name",
            "company_name",
            "matched_contact",
            "matched_tax_id",
            "link_type",
            "strength",
        ])
        .map_err(export_error)?;
    }
    for link in links {
        csv.serialize(link).map_err(export_error)?;
    }

    csv.flush().map_err(export_error)?;
    Ok(())
}

/// One flattened row of the reconciled transaction report
#[derive(Serialize)]
struct TransactionRow<'a> {
    date: String,
    document: &'a str,
    description: &'a str,
    amount: String,
    transaction_type: String,
    partial_identifier: &'a str,
    payee_name: &'a str,
    ted_code: &'a str,
    match_status: String,
    match_method: String,
    contact_name: &'a str,
    contact_tax_id: &'a str,
    candidates: usize,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(txn: &'a Transaction) -> Self {
        Self {
            date: txn.date.format("%d/%m/%Y").to_string(),
            document: &txn.document,
            description: &txn.description,
            amount: format!("{:.2}", txn.amount.as_decimal()).replace('.', ","),
            transaction_type: txn.transaction_type.to_string(),
            partial_identifier: &txn.partial_identifier,
            payee_name: &txn.payee_name,
            ted_code: txn.ted_code.as_deref().unwrap_or(""),
            match_status: txn.match_status.to_string(),
            match_method: txn
                .match_method
                .map(|m| m.to_string())
                .unwrap_or_default(),
            contact_name: txn.contact.as_ref().map(|c| c.best_name()).unwrap_or(""),
            contact_tax_id: txn.contact.as_ref().map(|c| c.tax_id_str()).unwrap_or(""),
            candidates: txn.matched_contacts.len(),
        }
    }
}

/// Export reconciled transactions to CSV, one row per transaction
pub fn export_transactions_csv<W: Write>(
    transactions: &[Transaction],
    writer: &mut W,
) -> ReconResult<()> {
    writer.write_all(UTF8_BOM).map_err(export_error)?;
    let mut csv = semicolon_writer(writer);
    for txn in transactions {
        csv.serialize(TransactionRow::from(txn)).map_err(export_error)?;
    }
    csv.flush().map_err(export_error)?;
    Ok(())
}

/// Write candidate links to a CSV file atomically
pub fn write_links_csv(path: &Path, links: &[CandidateLink]) -> ReconResult<()> {
    write_atomic(path, |writer| export_links_csv(links, writer))
}

/// Write reconciled transactions to a CSV file atomically
pub fn write_transactions_csv(path: &Path, transactions: &[Transaction]) -> ReconResult<()> {
    write_atomic(path, |writer| export_transactions_csv(transactions, writer))
}
