//! Single registry lookup command

use crate::config::Settings;
use crate::error::ReconResult;
use crate::models::RegistryRecord;
use crate::services::{LookupOrigin, RegistryClient};
use crate::storage::Storage;

/// Handle the lookup command
pub fn handle_lookup_command(
    storage: &Storage,
    settings: &Settings,
    tax_id: &str,
    json: bool,
) -> ReconResult<()> {
    let client = RegistryClient::from_settings(storage.cache.clone(), &settings.registry)?;
    client.ensure_configured()?;
    let (record, origin) = client.lookup_traced(tax_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let origin = match origin {
        LookupOrigin::Cache => "cache",
        LookupOrigin::Upstream => "registry",
        LookupOrigin::Rejected | LookupOrigin::Skipped => "not queried",
    };
    print!("{}", format_record(&record));
    println!("Source:       {}", origin);
    Ok(())
}

/// Human-readable view of one registry record
pub fn format_record(record: &RegistryRecord) -> String {
    let mut output = format!("CNPJ:         {}\n", record.tax_id);

    if let Some(error) = &record.error {
        output.push_str(&format!("Error:        {}\n", error));
        return output;
    }

    output.push_str(&format!("Legal name:   {}\n", record.legal_name));
    if !record.trade_name.is_empty() {
        output.push_str(&format!("Trade name:   {}\n", record.trade_name));
    }
    if let Some(status) = &record.status {
        output.push_str(&format!("Status:       {}\n", status));
    }
    if let Some(address) = &record.address {
        output.push_str(&format!("Address:      {}\n", address));
    }
    if !record.partners.is_empty() {
        output.push_str("Partners:\n");
        for partner in &record.partners {
            if partner.role.is_empty() {
                output.push_str(&format!("  - {}\n", partner.name));
            } else {
                output.push_str(&format!("  - {} ({})\n", partner.name, partner.role));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LookupFailure, Partner};

    #[test]
    fn test_format_record() {
        let mut record = RegistryRecord::new("12345678000199");
        record.legal_name = "ACME COMERCIO LTDA".into();
        record.status = Some("ATIVA".into());
        record.partners = vec![Partner::new("ANA SOUZA", "Sócia")];

        let text = format_record(&record);
        assert!(text.contains("Legal name:   ACME COMERCIO LTDA"));
        assert!(text.contains("Status:       ATIVA"));
        assert!(text.contains("  - ANA SOUZA (Sócia)"));
        assert!(!text.contains("Trade name"));
    }

    #[test]
    fn test_format_failed_record() {
        let record = RegistryRecord::failed(
            "00000000000000",
            LookupFailure::InvalidIdentifier {
                reason: "all zeros".into(),
            },
        );
        let text = format_record(&record);
        assert!(text.contains("Error:        invalid identifier: all zeros"));
        assert!(!text.contains("Legal name"));
    }
}
