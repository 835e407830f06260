//! Alias file repository
//!
//! A `;`-separated `name; tax_id` list (the spreadsheet side writes
//! `nome; cpf`). Rows are returned verbatim; normalization happens in the
//! alias integrator.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::file_io::{read_text, semicolon_reader, semicolon_writer, write_atomic, UTF8_BOM};
use crate::error::{ReconError, ReconResult};
use crate::models::AliasEntry;

/// Repository for the alias file
pub struct AliasRepository {
    path: PathBuf,
}

impl AliasRepository {
    /// Create a new alias repository
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the alias file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether an alias file is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load aliases in file order; a missing file gives an empty list
    pub fn load(&self) -> ReconResult<Vec<AliasEntry>> {
        let Some(text) = read_text(&self.path)? else {
            return Ok(Vec::new());
        };
        parse_aliases(&text).map_err(|e| ReconError::storage("parse", &self.path, e))
    }

    /// Replace the alias file
    pub fn save(&self, aliases: &[AliasEntry]) -> ReconResult<()> {
        write_atomic(&self.path, |writer| {
            writer.write_all(UTF8_BOM)?;
            let mut csv = semicolon_writer(writer);
            csv.write_record(["name", "tax_id"])?;
            for alias in aliases {
                csv.write_record([alias.name.as_str(), alias.tax_id.as_str()])?;
            }
            csv.flush()?;
            Ok(())
        })
    }
}

/// Parse alias rows from CSV text
pub fn parse_aliases(text: &str) -> ReconResult<Vec<AliasEntry>> {
    let mut reader = semicolon_reader(text);
    let mut aliases = Vec::new();

    for (idx, result) in reader.deserialize::<AliasEntry>().enumerate() {
        match result {
            Ok(alias) => aliases.push(alias),
            Err(e) => debug!(row = idx + 2, error = %e, "Skipping unreadable alias row"),
        }
    }

    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_portuguese_headers() {
        let aliases = parse_aliases("nome;cpf\nAna;111.222.333-44\nBeto;\n").unwrap();
        assert_eq!(
            aliases,
            vec![
                AliasEntry::new("Ana", "111.222.333-44"),
                AliasEntry::new("Beto", ""),
            ]
        );
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let repo = AliasRepository::new(temp_dir.path().join("aliases.csv"));
        assert!(!repo.exists());

        let aliases = vec![AliasEntry::new("Ana", "11122233344")];
        repo.save(&aliases).unwrap();

        assert_eq!(repo.load().unwrap(), aliases);
    }
}
