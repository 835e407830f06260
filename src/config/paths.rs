//! Path management for the reconciler
//!
//! Resolves where contacts, aliases, the registry cache and run outputs live.
//!
//! ## Path Resolution Order
//!
//! 1. `PAYEE_RECON_DIR` environment variable (if set)
//! 2. The platform config directory for `payee-reconciler`
//!    (`~/.config/payee-reconciler` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::ReconError;

/// Manages all paths used by a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconPaths {
    /// Base directory for all reconciler data
    base_dir: PathBuf,
}

impl ReconPaths {
    /// Create a new ReconPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined and
    /// `PAYEE_RECON_DIR` is not set.
    pub fn new() -> Result<Self, ReconError> {
        let base_dir = if let Ok(custom) = std::env::var("PAYEE_RECON_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create ReconPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (contacts, aliases, cache)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the output directory (reconciled transactions, link reports)
    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join("output")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to contacts.csv
    pub fn contacts_file(&self) -> PathBuf {
        self.data_dir().join("contacts.csv")
    }

    /// Get the path to aliases.csv
    pub fn aliases_file(&self) -> PathBuf {
        self.data_dir().join("aliases.csv")
    }

    /// Get the path to the registry cache
    pub fn registry_cache_file(&self) -> PathBuf {
        self.data_dir().join("registry_cache.json")
    }

    /// Get the path to the parsed statement (external parser output)
    pub fn transactions_file(&self) -> PathBuf {
        self.data_dir().join("transactions.json")
    }

    /// Get the path to the reconciled transactions output
    pub fn reconciled_file(&self) -> PathBuf {
        self.output_dir().join("reconciled_transactions.json")
    }

    /// Get the path to the reconciled transactions spreadsheet
    pub fn reconciled_csv_file(&self) -> PathBuf {
        self.output_dir().join("reconciled_transactions.csv")
    }

    /// Get the path to the candidate-link CSV report
    pub fn links_csv_file(&self) -> PathBuf {
        self.output_dir().join("candidate_links.csv")
    }

    /// Get the path to the candidate-link JSON report
    pub fn links_json_file(&self) -> PathBuf {
        self.output_dir().join("candidate_links.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), ReconError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ReconError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| ReconError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.output_dir())
            .map_err(|e| ReconError::Io(format!("Failed to create output directory: {}", e)))?;

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, ReconError> {
    ProjectDirs::from("", "", "payee-reconciler")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| ReconError::Config("Could not determine a home directory".into()))
}
