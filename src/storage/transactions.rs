//! Transaction file repository
//!
//! The statement parser hands over a JSON array of transactions, either bare
//! or wrapped as `{"transactions": [...]}` / `{"lancamentos": [...]}`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::file_io::{read_text, write_json_atomic};
use crate::error::{ReconError, ReconResult};
use crate::models::Transaction;

#[derive(Deserialize)]
#[serde(untagged)]
enum StatementFile {
    List(Vec<Transaction>),
    Wrapped {
        #[serde(alias = "lancamentos")]
        transactions: Vec<Transaction>,
    },
}

/// Repository for transaction JSON files
pub struct TransactionRepository {
    path: PathBuf,
}

impl TransactionRepository {
    /// Create a new transaction repository
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the transaction file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load transactions; the file must exist
    pub fn load(&self) -> ReconResult<Vec<Transaction>> {
        let text = read_text(&self.path)?.ok_or_else(|| {
            ReconError::Storage(format!("File not found: {}", self.path.display()))
        })?;

        let file: StatementFile = serde_json::from_str(&text).map_err(|e| {
            ReconError::Validation(format!("{}: {}", self.path.display(), e))
        })?;

        Ok(match file {
            StatementFile::List(transactions) => transactions,
            StatementFile::Wrapped { transactions } => transactions,
        })
    }

    /// Write transactions as a JSON array
    pub fn save(&self, transactions: &[Transaction]) -> ReconResult<()> {
        write_json_atomic(&self.path, &transactions)
    }
}
