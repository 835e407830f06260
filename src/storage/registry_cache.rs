//! Persistent cache of registry lookups
//!
//! A JSON object keyed by the normalized 14-digit company identifier. Only
//! successful lookups are stored. Malformed content is moved aside to a
//! timestamped `.corrupt-*` sibling and the cache starts over empty; only an
//! unreadable or unwritable file is reported as an error.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::file_io::{timestamped_sibling, write_json_atomic};
use crate::error::{ReconError, ReconResult};
use crate::models::RegistryRecord;

/// In-memory view of the cache file
pub type CacheMap = BTreeMap<String, RegistryRecord>;

/// File-backed registry cache
#[derive(Debug, Clone)]
pub struct RegistryCache {
    path: PathBuf,
}

impl RegistryCache {
    /// Create a cache over the given file; nothing is read until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file next to the cache
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Load the whole cache
    ///
    /// Missing or empty file gives an empty map. Content that is not a JSON
    /// object is quarantined and an empty map returned. Individual entries
    /// that cannot be read, and legacy entries that recorded a failure, are
    /// skipped.
    pub fn load(&self) -> ReconResult<CacheMap> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheMap::new()),
            Err(e) => return Err(ReconError::storage("read", &self.path, e)),
        };

        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim_start_matches('\u{feff}').trim();
        if text.is_empty() {
            return Ok(CacheMap::new());
        }

        let raw: serde_json::Map<String, Value> = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                let backup = self.quarantine()?;
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Registry cache is corrupt; moved aside and starting empty"
                );
                return Ok(CacheMap::new());
            }
        };

        let mut cache = CacheMap::new();
        for (key, value) in raw {
            if value.get("erro").is_some() {
                debug!(tax_id = %key, "Dropping legacy failed lookup from cache");
                continue;
            }
            match serde_json::from_value::<RegistryRecord>(value) {
                Ok(mut record) if record.is_ok() => {
                    if record.tax_id.is_empty() {
                        record.tax_id = key.clone();
                    }
                    cache.insert(key, record);
                }
                Ok(_) => debug!(tax_id = %key, "Dropping failed lookup from cache"),
                Err(e) => warn!(tax_id = %key, error = %e, "Skipping unreadable cache entry"),
            }
        }

        Ok(cache)
    }

    /// Look up one identifier
    pub fn get(&self, tax_id: &str) -> ReconResult<Option<RegistryRecord>> {
        Ok(self.load()?.remove(tax_id))
    }

    /// Store a successful lookup, replacing any previous entry
    ///
    /// The read-modify-write runs under an exclusive lock on the sibling
    /// `.lock` file, and the new content replaces the cache atomically.
    pub fn put(&self, tax_id: &str, record: &RegistryRecord) -> ReconResult<()> {
        if !record.is_ok() {
            debug!(tax_id, "Not caching a failed lookup");
            return Ok(());
        }

        let _guard = self.lock()?;
        let mut cache = self.load()?;
        cache.insert(tax_id.to_string(), record.clone());
        write_json_atomic(&self.path, &cache)?;

        debug!(tax_id, path = %self.path.display(), "Registry cache updated");
        Ok(())
    }

    /// Move the current cache aside and start a new empty one
    ///
    /// Returns the backup path, or `None` when there was no cache file.
    pub fn reset(&self) -> ReconResult<Option<PathBuf>> {
        let _guard = self.lock()?;

        let backup = if self.path.exists() {
            Some(self.quarantine()?)
        } else {
            None
        };
        write_json_atomic(&self.path, &CacheMap::new())?;

        info!(path = %self.path.display(), "Registry cache reset");
        Ok(backup)
    }

    /// Every cached record, ordered by identifier
    pub fn entries(&self) -> ReconResult<Vec<RegistryRecord>> {
        Ok(self.load()?.into_values().collect())
    }

    fn quarantine(&self) -> ReconResult<PathBuf> {
        let backup = timestamped_sibling(&self.path, "corrupt");
        fs::rename(&self.path, &backup)
            .map_err(|e| ReconError::storage("quarantine", &self.path, e))?;
        Ok(backup)
    }

    fn lock(&self) -> ReconResult<CacheLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ReconError::storage("create directory", parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| ReconError::storage("open", &lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| ReconError::storage("lock", &lock_path, e))?;

        Ok(CacheLock { file })
    }
}

/// Holds the exclusive lock until dropped
struct CacheLock {
    file: File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LookupFailure, Partner};
    use tempfile::TempDir;

    fn record(tax_id: &str, legal_name: &str) -> RegistryRecord {
        let mut record = RegistryRecord::new(tax_id);
        record.legal_name = legal_name.into();
        record.partners.push(Partner::new("ANA SOUZA", "Sócio-Administrador"));
        record
    }

    fn backups(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".corrupt-"))
            .collect()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));

        assert!(cache.load().unwrap().is_empty());
        assert!(backups(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_empty_file_is_empty_without_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, "  \n").unwrap();

        let cache = RegistryCache::new(&path);
        assert!(cache.load().unwrap().is_empty());
        assert!(backups(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        let acme = record("12345678000199", "ACME COMERCIO LTDA");

        cache.put("12345678000199", &acme).unwrap();

        assert_eq!(cache.get("12345678000199").unwrap(), Some(acme));
        assert_eq!(cache.get("99999999000199").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_entry() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));

        cache.put("12345678000199", &record("12345678000199", "OLD NAME")).unwrap();
        let mut replacement = RegistryRecord::new("12345678000199");
        replacement.trade_name = "NEW".into();
        cache.put("12345678000199", &replacement).unwrap();

        let stored = cache.get("12345678000199").unwrap().unwrap();
        assert_eq!(stored.legal_name, "");
        assert!(stored.partners.is_empty());
        assert_eq!(stored.trade_name, "NEW");
    }

    #[test]
    fn test_corrupt_cache_recovery() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(&path, b"\x00\x01{{{ not json").unwrap();

        let cache = RegistryCache::new(&path);
        assert!(cache.load().unwrap().is_empty());
        assert_eq!(backups(temp_dir.path()).len(), 1);
        assert!(!path.exists());

        cache.put("12345678000199", &record("12345678000199", "ACME")).unwrap();
        assert_eq!(cache.load().unwrap().len(), 1);
        assert_eq!(backups(temp_dir.path()).len(), 1);
    }

    #[test]
    fn test_failed_records_are_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        let failed = RegistryRecord::failed(
            "12345678000199",
            LookupFailure::Unavailable {
                attempts: 3,
                message: "timeout".into(),
            },
        );

        cache.put("12345678000199", &failed).unwrap();
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_legacy_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        fs::write(
            &path,
            r#"{
                "12345678000199": {"cnpj": "12345678000199", "razao_social": "ACME LTDA", "nome_fantasia": null, "qsa": []},
                "11111111000111": {"cnpj": "11111111000111", "erro": "timeout"},
                "22222222000122": {"razao_social": "NO ID LTDA"}
            }"#,
        )
        .unwrap();

        let cache = RegistryCache::new(&path).load().unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache["12345678000199"].legal_name, "ACME LTDA");
        assert_eq!(cache["22222222000122"].tax_id, "22222222000122");
    }

    #[test]
    fn test_reset_quarantines_and_empties() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        cache.put("12345678000199", &record("12345678000199", "ACME")).unwrap();

        let backup = cache.reset().unwrap();

        assert!(backup.unwrap().exists());
        assert!(cache.load().unwrap().is_empty());
        assert!(cache.path().exists());
    }

    #[test]
    fn test_entries_are_ordered() {
        let temp_dir = TempDir::new().unwrap();
        let cache = RegistryCache::new(temp_dir.path().join("cache.json"));
        cache.put("22222222000122", &record("22222222000122", "B")).unwrap();
        cache.put("11111111000111", &record("11111111000111", "A")).unwrap();

        let ids: Vec<String> = cache.entries().unwrap().into_iter().map(|r| r.tax_id).collect();
        assert_eq!(ids, vec!["11111111000111", "22222222000122"]);
    }
}
