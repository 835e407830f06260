//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::error::ReconError;

/// UTF-8 byte order mark written at the start of tabular exports
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read a text file, dropping a leading byte order mark
///
/// Returns `None` when the file does not exist.
pub fn read_text<P: AsRef<Path>>(path: P) -> Result<Option<String>, ReconError> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(bytes) => {
            let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
            String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| ReconError::storage("decode", path, e))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReconError::storage("read", path, e)),
    }
}

/// CSV reader for the `;`-separated files exchanged with the spreadsheet side
pub fn semicolon_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

/// CSV writer counterpart of [`semicolon_reader`]
pub fn semicolon_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b';').from_writer(writer)
}

/// Write a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all. `fill`
/// receives a buffered writer over the temp file.
pub fn write_atomic<P, F>(path: P, fill: F) -> Result<(), ReconError>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ReconError>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| ReconError::storage("create directory", parent, e))?;
        }
    }

    // Temp file in the same directory so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let file =
        File::create(&temp_path).map_err(|e| ReconError::storage("create", &temp_path, e))?;

    let mut writer = BufWriter::new(file);
    let result = fill(&mut writer)
        .and_then(|_| {
            writer
                .flush()
                .map_err(|e| ReconError::storage("flush", &temp_path, e))
        })
        .and_then(|_| {
            writer
                .get_ref()
                .sync_all()
                .map_err(|e| ReconError::storage("sync", &temp_path, e))
        });

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ReconError::storage("replace", path, e)
    })?;

    Ok(())
}

/// Write JSON to a file atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), ReconError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(writer, data)
            .map_err(|e| ReconError::storage("serialize", path, e))
    })
}

/// Sibling path carrying a millisecond timestamp, e.g.
/// `registry_cache.json.corrupt-20250301-101500-042`
pub fn timestamped_sibling(path: &Path, tag: &str) -> PathBuf {
    let now = Local::now();
    let stamp = format!(
        "{}-{:03}",
        now.format("%Y%m%d-%H%M%S"),
        now.timestamp_subsec_millis()
    );
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}-{}", tag, stamp));
    path.with_file_name(name)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        write_json_atomic(&path, &data).unwrap();
        let loaded: TestData = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(data, loaded);
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        write_json_atomic(&path, &TestData::default()).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join("test.json.tmp").exists());
    }

    #[test]
    fn test_failed_fill_leaves_target_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contacts.csv");
        fs::write(&path, "original").unwrap();

        let result = write_atomic(&path, |_| Err(ReconError::Export("boom".into())));

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!temp_dir.path().join("contacts.csv.tmp").exists());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("test.json");

        write_json_atomic(&path, &TestData::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_read_text_strips_bom() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contacts.csv");
        fs::write(&path, b"\xEF\xBB\xBFtax_id;display_name\n").unwrap();

        let text = read_text(&path).unwrap().unwrap();
        assert!(text.starts_with("tax_id"));
        assert!(read_text(temp_dir.path().join("missing.csv")).unwrap().is_none());
    }

    #[test]
    fn test_timestamped_sibling() {
        let path = PathBuf::from("/data/registry_cache.json");
        let backup = timestamped_sibling(&path, "corrupt");
        let name = backup.file_name().unwrap().to_string_lossy().to_string();

        assert_eq!(backup.parent(), path.parent());
        assert!(name.starts_with("registry_cache.json.corrupt-"));
        // YYYYmmdd-HHMMSS-mmm
        assert_eq!(name.len(), "registry_cache.json.corrupt-".len() + 19);
    }
}
