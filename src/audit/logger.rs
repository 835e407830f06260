//! Audit logger for append-only audit log
//!
//! Provides the AuditLogger struct that writes audit entries to a log file.
//! Each entry is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{ReconError, ReconResult};
use crate::models::ContactChange;

use super::entry::AuditEntry;

/// Handles writing audit entries to the audit log file
///
/// The log file uses a line-delimited JSON format (JSONL) where each line
/// is a complete JSON object representing one audit entry.
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    /// Create a new AuditLogger that writes to the specified path
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    fn open_for_append(&self) -> ReconResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| ReconError::storage("open audit log", &self.log_path, e))
    }

    /// Append one entry and flush
    pub fn log(&self, entry: &AuditEntry) -> ReconResult<()> {
        self.log_batch(std::slice::from_ref(entry))
    }

    /// Append several entries with a single flush at the end
    pub fn log_batch(&self, entries: &[AuditEntry]) -> ReconResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut writer = BufWriter::new(self.open_for_append()?);
        for entry in entries {
            let json = serde_json::to_string(entry)
                .map_err(|e| ReconError::Json(format!("Failed to serialize audit entry: {}", e)))?;
            writeln!(writer, "{}", json)
                .map_err(|e| ReconError::storage("write audit log", &self.log_path, e))?;
        }
        writer
            .flush()
            .map_err(|e| ReconError::storage("flush audit log", &self.log_path, e))?;

        Ok(())
    }

    /// Record a set of directory mutations under one origin
    pub fn log_changes(&self, changes: &[ContactChange], origin: &str) -> ReconResult<()> {
        let entries: Vec<AuditEntry> = changes
            .iter()
            .map(|change| AuditEntry::for_contact_change(change, origin))
            .collect();
        self.log_batch(&entries)
    }

    /// Read all audit entries from the log file
    ///
    /// Returns entries in chronological order (oldest first).
    pub fn read_all(&self) -> ReconResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| ReconError::storage("open audit log", &self.log_path, e))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| ReconError::storage("read audit log", &self.log_path, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                ReconError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Read the most recent N entries from the log
    pub fn read_recent(&self, count: usize) -> ReconResult<Vec<AuditEntry>> {
        let mut entries = self.read_all()?;
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    /// Get the path to the audit log file
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}
