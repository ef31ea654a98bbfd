//! Record extraction: one raw record to one canonical client draft.

use serde_json::Value;

use crate::models::{ClientDraft, UNKNOWN_CLIENT};
use crate::transform::aliases::{
    self, COMPANY_ID_ALIASES, COMPANY_NAME_ALIASES, DISPLAY_ID_ALIASES, NAME_ALIASES,
    OLD_COMPANY_ID_ALIASES, TYPES_ALIASES,
};

/// Extract a client draft from one raw record.
///
/// The name is resolved through [`NAME_ALIASES`]; a record that is itself a
/// primitive string becomes the name directly; otherwise the draft gets the
/// [`UNKNOWN_CLIENT`] placeholder so validation still surfaces a visible row.
/// Secondary fields are extracted independently through their own alias
/// lists, and `api_url` is stamped from the caller-supplied base URL.
pub fn extract(record: &Value, base_url: Option<&str>) -> ClientDraft {
    let fields = record.as_object();

    let name = fields
        .and_then(|obj| aliases::resolve_string(obj, NAME_ALIASES))
        .or_else(|| record.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    let mut draft = ClientDraft::named(name);
    draft.api_url = base_url.map(|url| url.to_string());

    if let Some(obj) = fields {
        draft.company_id = aliases::resolve_string(obj, COMPANY_ID_ALIASES);
        draft.company_name = aliases::resolve_string(obj, COMPANY_NAME_ALIASES);
        draft.old_company_id = aliases::resolve_string(obj, OLD_COMPANY_ID_ALIASES);
        draft.display_id = aliases::resolve_string(obj, DISPLAY_ID_ALIASES);
        draft.types = aliases::resolve(obj, TYPES_ALIASES).and_then(extract_types);
    }

    draft
}

/// Client type tags: an array of scalars, or a single scalar.
fn extract_types(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => {
            let tags: Vec<String> = items.iter().filter_map(aliases::scalar_to_string).collect();
            if tags.is_empty() {
                None
            } else {
                Some(tags)
            }
        }
        other => aliases::scalar_to_string(other).map(|tag| vec![tag]),
    }
}
