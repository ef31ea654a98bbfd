//! Field-alias tables for record extraction.
//!
//! Each canonical field is resolved through an ordered list of synonyms,
//! evaluated top to bottom, first match wins. The tables are static
//! configuration: keeping the tie-break order as data (instead of a chain of
//! conditionals) makes it directly testable.

use serde_json::{Map, Value};

/// Name-equivalent fields, in resolution priority order.
///
/// The business fallbacks (`company_name` before `company_id`) come last: a
/// human-readable company name makes a better client name than an opaque id,
/// but any dedicated name field outranks both.
pub const NAME_ALIASES: &[&str] = &[
    "name",
    "client_name",
    "clientName",
    "cnr",
    "cnr_name",
    "cnrName",
    "customer",
    "customer_name",
    "customerName",
    "title",
    "label",
    "company_name",
    "companyName",
    "company_id",
    "companyId",
];

pub const COMPANY_ID_ALIASES: &[&str] = &["company_id", "companyId"];

pub const COMPANY_NAME_ALIASES: &[&str] = &["company_name", "companyName"];

pub const OLD_COMPANY_ID_ALIASES: &[&str] = &["old_company_id", "oldCompanyId"];

pub const DISPLAY_ID_ALIASES: &[&str] = &["display_id", "displayId"];

pub const TYPES_ALIASES: &[&str] = &["types", "type"];

/// Normalize a key for format-insensitive comparison: lower-cased, spaces
/// replaced with underscores.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Resolve a field through an ordered alias list.
///
/// For each alias in order, an exact key match wins; otherwise the record's
/// keys are compared in normalized form, so `"Company ID"` satisfies the
/// `company_id` alias even when the record was not dual-keyed by the CSV
/// tokenizer.
pub fn resolve<'a>(record: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = record.get(*alias) {
            return Some(value);
        }
        let normalized_alias = normalize_key(alias);
        if let Some((_, value)) = record
            .iter()
            .find(|(key, _)| normalize_key(key) == normalized_alias)
        {
            return Some(value);
        }
    }
    None
}

/// Resolve a field to a string, stringifying scalar numbers and booleans.
pub fn resolve_string(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    resolve(record, aliases).and_then(scalar_to_string)
}

/// Render a scalar JSON value as a string; arrays and objects resolve to None.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_first_alias_wins() {
        let rec = record(json!({"client_name": "Beta", "name": "Acme"}));
        assert_eq!(resolve_string(&rec, NAME_ALIASES).unwrap(), "Acme");
    }

    #[test]
    fn test_name_outranks_company_fields() {
        let rec = record(json!({"company_id": "C-1", "company_name": "Acme Corp", "name": "Acme"}));
        assert_eq!(resolve_string(&rec, NAME_ALIASES).unwrap(), "Acme");
    }

    #[test]
    fn test_company_name_outranks_company_id() {
        let rec = record(json!({"company_id": "C-1", "company_name": "Acme Corp"}));
        assert_eq!(resolve_string(&rec, NAME_ALIASES).unwrap(), "Acme Corp");
    }

    #[test]
    fn test_normalized_key_comparison() {
        let rec = record(json!({"Company ID": "C-1"}));
        assert_eq!(resolve_string(&rec, COMPANY_ID_ALIASES).unwrap(), "C-1");
    }

    #[test]
    fn test_numbers_stringify() {
        let rec = record(json!({"display_id": 42}));
        assert_eq!(resolve_string(&rec, DISPLAY_ID_ALIASES).unwrap(), "42");
    }

    #[test]
    fn test_nested_values_do_not_resolve() {
        let rec = record(json!({"name": {"first": "A"}}));
        assert!(resolve_string(&rec, NAME_ALIASES).is_none());
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Company ID"), "company_id");
        assert_eq!(normalize_key("  Client Name "), "client_name");
    }
}
