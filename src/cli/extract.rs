//! Description scanning command

use crate::error::ReconResult;
use crate::services::extractor::scan;
use crate::services::normalizer::classify_partial;

/// Handle the extract command
pub fn handle_extract_command(description: &str, json: bool) -> ReconResult<()> {
    let details = scan(description);

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    match &details.identifier {
        Some(found) => {
            let (kind, digits) = classify_partial(&found.raw);
            println!("Identifier:  {} ({})", found.raw, found.source);
            println!("Digits:      {} ({})", digits, kind);
        }
        None => println!("Identifier:  (none)"),
    }
    println!(
        "Payee:       {}",
        details.payee_name.as_deref().unwrap_or("(none)")
    );
    if let Some(code) = &details.ted_code {
        println!("TED code:    {}", code);
    }

    Ok(())
}
