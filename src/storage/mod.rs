//! Storage layer for the reconciler
//!
//! Flat-file repositories for contacts, aliases and transactions, plus the
//! registry cache. All writes go through temp-file-and-rename.

pub mod aliases;
pub mod contacts;
pub mod file_io;
pub mod registry_cache;
pub mod transactions;

pub use aliases::AliasRepository;
pub use contacts::ContactRepository;
pub use file_io::write_json_atomic;
pub use registry_cache::{CacheMap, RegistryCache};
pub use transactions::TransactionRepository;

use crate::config::paths::ReconPaths;
use crate::error::ReconError;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: ReconPaths,
    pub contacts: ContactRepository,
    pub aliases: AliasRepository,
    pub transactions: TransactionRepository,
    pub cache: RegistryCache,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: ReconPaths) -> Result<Self, ReconError> {
        paths.ensure_directories()?;

        Ok(Self {
            contacts: ContactRepository::new(paths.contacts_file()),
            aliases: AliasRepository::new(paths.aliases_file()),
            transactions: TransactionRepository::new(paths.transactions_file()),
            cache: RegistryCache::new(paths.registry_cache_file()),
            paths,
        })
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &ReconPaths {
        &self.paths
    }

    /// Check if storage has been initialized
    pub fn is_initialized(&self) -> bool {
        self.paths.settings_file().exists()
    }
}
