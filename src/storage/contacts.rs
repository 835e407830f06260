//! Contact file repository
//!
//! Contacts live in a `;`-separated, UTF-8 (with BOM) file with the columns
//! `tax_id; display_name; legal_name; trade_name; partners`, where `partners`
//! is a JSON array embedded in a single field. Files exported by the
//! spreadsheet side with Portuguese headers (`cpf_cnpj; nome; razao_social;
//! nome_fantasia; socios`) are read as well.

use std::io::Write;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, warn};

use super::file_io::{read_text, semicolon_reader, semicolon_writer, write_atomic, UTF8_BOM};
use crate::error::{ReconError, ReconResult};
use crate::models::{Contact, Partner};

const HEADER: [&str; 5] = ["tax_id", "display_name", "legal_name", "trade_name", "partners"];

/// Column positions detected from the header row
#[derive(Debug, Clone, Default)]
struct ContactColumns {
    tax_id: Option<usize>,
    display_name: Option<usize>,
    legal_name: Option<usize>,
    trade_name: Option<usize>,
    partners: Option<usize>,
}

impl ContactColumns {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut columns = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let h = header.trim().trim_start_matches('\u{feff}').to_lowercase();
            match h.as_str() {
                "tax_id" | "cpf_cnpj" | "cpf/cnpj" => columns.tax_id = Some(idx),
                "display_name" | "nome" | "name" => columns.display_name = Some(idx),
                "legal_name" | "razao_social" => columns.legal_name = Some(idx),
                "trade_name" | "nome_fantasia" => columns.trade_name = Some(idx),
                "partners" | "socios" => columns.partners = Some(idx),
                _ => {}
            }
        }
        columns
    }

    fn field(record: &StringRecord, column: Option<usize>) -> String {
        column
            .and_then(|idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }
}

/// Repository for the contact file
pub struct ContactRepository {
    path: PathBuf,
}

impl ContactRepository {
    /// Create a new contact repository
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the contact file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load contacts in file order; a missing file gives an empty list
    pub fn load(&self) -> ReconResult<Vec<Contact>> {
        let Some(text) = read_text(&self.path)? else {
            debug!(path = %self.path.display(), "No contact file, starting empty");
            return Ok(Vec::new());
        };

        parse_contacts(&text).map_err(|e| match e {
            ReconError::Validation(msg) => {
                ReconError::Validation(format!("{}: {}", self.path.display(), msg))
            }
            other => ReconError::storage("parse", &self.path, other),
        })
    }

    /// Replace the contact file
    pub fn save(&self, contacts: &[Contact]) -> ReconResult<()> {
        write_atomic(&self.path, |writer| {
            writer.write_all(UTF8_BOM)?;
            write_contacts(writer, contacts)
        })
    }
}

/// Parse contact rows from CSV text
pub fn parse_contacts(text: &str) -> ReconResult<Vec<Contact>> {
    let mut reader = semicolon_reader(text);
    let headers = reader.headers()?.clone();
    let columns = ContactColumns::from_headers(&headers);

    if columns.tax_id.is_none() {
        return Err(ReconError::Validation(
            "contact file has no tax_id (or cpf_cnpj) column".into(),
        ));
    }

    let mut contacts = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let row_number = idx + 2;

        let partners_raw = ContactColumns::field(&record, columns.partners);
        let mut raw_partners = None;
        let partners = if partners_raw.is_empty() {
            Vec::new()
        } else {
            match serde_json::from_str::<Vec<Partner>>(&partners_raw) {
                Ok(partners) => partners,
                Err(e) => {
                    warn!(row = row_number, error = %e, "Unreadable partner list kept as written");
                    raw_partners = Some(partners_raw);
                    Vec::new()
                }
            }
        };

        let tax_id = ContactColumns::field(&record, columns.tax_id);
        let mut contact = Contact::new(
            Some(tax_id),
            ContactColumns::field(&record, columns.display_name),
        );
        contact.legal_name = ContactColumns::field(&record, columns.legal_name);
        contact.trade_name = ContactColumns::field(&record, columns.trade_name);
        contact.partners = partners;
        contact.raw_partners = raw_partners;

        if contact.tax_id.is_none() && contact.names().next().is_none() {
            debug!(row = row_number, "Skipping blank contact row");
            continue;
        }
        contacts.push(contact);
    }

    Ok(contacts)
}

/// Write contact rows (header included) to any writer
pub fn write_contacts<W: Write>(writer: W, contacts: &[Contact]) -> ReconResult<()> {
    let mut csv = semicolon_writer(writer);
    csv.write_record(HEADER)?;

    for contact in contacts {
        let partners = if !contact.partners.is_empty() {
            serde_json::to_string(&contact.partners)?
        } else {
            contact.raw_partners.clone().unwrap_or_default()
        };
        let tax_id = contact
            .tax_id
            .as_deref()
            .or(contact.raw_tax_id.as_deref())
            .unwrap_or("");
        csv.write_record([
            tax_id,
            contact.display_name.as_str(),
            contact.legal_name.as_str(),
            contact.trade_name.as_str(),
            partners.as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}
