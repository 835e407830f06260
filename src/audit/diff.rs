//! One-line diffs between the before/after snapshots of a contact
//!
//! Fields are reported in key order so the same change always renders the
//! same way. Partner lists are compared by name rather than by position.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

const MAX_SHOWN_CHARS: usize = 47;

/// Describe the top-level changes between two JSON values
///
/// Returns `None` when nothing changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    let changes = match (before, after) {
        (Value::Object(b), Value::Object(a)) => object_changes(b, a),
        _ if before != after => vec![format!("{} -> {}", show(before), show(after))],
        _ => Vec::new(),
    };

    (!changes.is_empty()).then(|| changes.join(", "))
}

fn object_changes(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<String> {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();

    keys.into_iter()
        .filter_map(|key| match (before.get(key), after.get(key)) {
            (Some(b), Some(a)) if b == a => None,
            (Some(Value::Array(b)), Some(Value::Array(a))) => Some(list_change(key, b, a)),
            (Some(b), Some(a)) => Some(format!("{}: {} -> {}", key, show(b), show(a))),
            (Some(b), None) => Some(format!("{}: {} -> (removed)", key, show(b))),
            (None, Some(a)) => Some(format!("{}: (added) -> {}", key, show(a))),
            (None, None) => None,
        })
        .collect()
}

/// Lists of named objects (partners) report which names came and went
fn list_change(key: &str, before: &[Value], after: &[Value]) -> String {
    let (Some(old), Some(new)) = (names(before), names(after)) else {
        return format!(
            "{}: [{} items] -> [{} items]",
            key,
            before.len(),
            after.len()
        );
    };

    let mut parts = Vec::new();
    for name in new.difference(&old) {
        parts.push(format!("+{}", name));
    }
    for name in old.difference(&new) {
        parts.push(format!("-{}", name));
    }
    if parts.is_empty() {
        // same names, different details
        return format!("{}: {} entries changed", key, after.len());
    }
    format!("{}: {}", key, parts.join(" "))
}

fn names(items: &[Value]) -> Option<BTreeSet<&str>> {
    items
        .iter()
        .map(|item| item.get("name").and_then(Value::as_str))
        .collect()
}

fn show(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > MAX_SHOWN_CHARS + 3 => {
            let head: String = s.chars().take(MAX_SHOWN_CHARS).collect();
            format!("\"{}...\"", head)
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
        other => other.to_string(),
    }
}
