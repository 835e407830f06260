//! Audit log command

use crate::audit::AuditLogger;
use crate::error::ReconResult;
use crate::storage::Storage;

/// Handle the audit command
pub fn handle_audit_command(storage: &Storage, limit: usize, json: bool) -> ReconResult<()> {
    let logger = AuditLogger::new(storage.paths().audit_log());
    let entries = logger.read_recent(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}", entry.format_human_readable());
    }
    Ok(())
}
