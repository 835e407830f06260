//! Alias models
//!
//! Aliases are an auxiliary `name; tax_id` list merged into the directory.

use serde::{Deserialize, Serialize};

use super::contact::ContactChange;

/// One row of the alias file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "cpf", alias = "cpf_cnpj")]
    pub tax_id: String,
}

impl AliasEntry {
    pub fn new(name: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
        }
    }
}

/// An alias whose name disagrees with the contact already holding its tax_id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasConflict {
    pub tax_id: String,
    pub existing_name: String,
    pub alias_name: String,
}

/// What an alias integration or backfill did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationReport {
    /// Contacts created from aliases
    pub added: usize,
    /// Existing contacts whose tax_id was overwritten (backfill only)
    pub updated: usize,
    /// Aliases skipped because their tax_id is already known
    pub skipped: usize,
    /// Aliases without a usable tax_id or name
    pub invalid: usize,
    /// Name disagreements under the same tax_id, left unresolved
    pub conflicts: Vec<AliasConflict>,
    /// Every contact created or updated, for the audit log
    #[serde(skip)]
    pub changes: Vec<ContactChange>,
}

impl IntegrationReport {
    /// Check whether the directory changed
    pub fn changed(&self) -> bool {
        self.added > 0 || self.updated > 0
    }
}
