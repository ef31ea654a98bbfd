//! Shape normalization: locate the record collection inside an API response
//! of unknown structure.
//!
//! Remote APIs wrap their record lists in all kinds of envelopes. Rather than
//! requiring a contract, the normalizer probes a fixed priority order:
//!
//! 1. the payload itself is an array;
//! 2. a conventional container field (checked in order) holds a non-empty
//!    array;
//! 3. structural fallback: the first field, in payload order, whose value is
//!    a non-empty array.
//!
//! The conventional names are checked before the structural scan so that
//! well-formed APIs are preferred over guesswork. No match returns an empty
//! vec: "no records found" is the caller's call, not an error.

use serde_json::Value;

/// Conventional container field names, in priority order.
pub const CONTAINER_FIELDS: &[&str] = &["clients", "data", "results", "content"];

/// Locate the best-guess record collection inside a decoded payload.
pub fn locate_records(value: &Value) -> Vec<Value> {
    if let Some(items) = value.as_array() {
        return items.clone();
    }

    let Some(obj) = value.as_object() else {
        return Vec::new();
    };

    for field in CONTAINER_FIELDS {
        if let Some(items) = obj.get(*field).and_then(Value::as_array) {
            if !items.is_empty() {
                return items.clone();
            }
        }
    }

    // Structural fallback: first non-empty array field in payload order.
    // serde_json's preserve_order feature keeps insertion order here.
    for value in obj.values() {
        if let Some(items) = value.as_array() {
            if !items.is_empty() {
                return items.clone();
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array_used_directly() {
        let payload = json!([{"name": "Acme"}, {"name": "Globex"}]);
        assert_eq!(locate_records(&payload).len(), 2);
    }

    #[test]
    fn test_empty_bare_array_used_directly() {
        assert!(locate_records(&json!([])).is_empty());
    }

    #[test]
    fn test_clients_container_outranks_data() {
        let payload = json!({
            "data": [{"name": "wrong"}],
            "clients": [{"name": "right"}]
        });
        let records = locate_records(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "right");
    }

    #[test]
    fn test_container_priority_order() {
        let payload = json!({
            "content": [{"name": "content"}],
            "results": [{"name": "results"}]
        });
        assert_eq!(locate_records(&payload)[0]["name"], "results");
    }

    #[test]
    fn test_empty_container_skipped() {
        let payload = json!({
            "clients": [],
            "data": [{"name": "Acme"}]
        });
        assert_eq!(locate_records(&payload)[0]["name"], "Acme");
    }

    #[test]
    fn test_structural_fallback_takes_first_array_in_order() {
        let payload = json!({
            "meta": {"page": 1},
            "zrecords": [{"name": "first"}],
            "items": [{"name": "second"}]
        });
        assert_eq!(locate_records(&payload)[0]["name"], "first");
    }

    #[test]
    fn test_no_collection_yields_empty() {
        assert!(locate_records(&json!({"status": "ok"})).is_empty());
        assert!(locate_records(&json!("just a string")).is_empty());
        assert!(locate_records(&json!(42)).is_empty());
    }
}
