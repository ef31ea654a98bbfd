//! Domain models for the Clientload ingestion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`ClientDraft`] - a client record extracted from raw input, pre-validation
//! - [`ValidationOutcome`] - per-draft validation verdict
//! - [`Batch`] - the validated set of drafts ready for persistence
//! - [`PersistedClient`] - a client as stored by the persistence capability
//! - [`Courier`] - courier record fetched from a registered client's API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::transport::RequestSpec;

/// Placeholder name used when no name-like field can be resolved.
///
/// Deliberately non-empty so the draft still surfaces as a visible row for
/// operator correction instead of vanishing before review.
pub const UNKNOWN_CLIENT: &str = "Unknown Client";

// =============================================================================
// Client Draft
// =============================================================================

/// A client record extracted from raw input, before validation.
///
/// `name` is always populated (falling back to [`UNKNOWN_CLIENT`]); all
/// secondary fields are left unset when the source record does not carry them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    /// Client display name. Normalized in place by the validation pipeline.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_company_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,

    /// Client type tags, verbatim from the source record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,

    /// Base URL of the API this draft was ingested from. Stamped by the
    /// extractor from the caller-supplied URL, never read from the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Request configuration to reuse for later courier fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_config: Option<RequestSpec>,
}

impl ClientDraft {
    /// Create a draft carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            company_id: None,
            company_name: None,
            old_company_id: None,
            display_id: None,
            types: None,
            api_url: None,
            request_config: None,
        }
    }
}

// =============================================================================
// Validation Outcome
// =============================================================================

/// Verdict attached to a single draft by the validation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: String::from("ok"),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

// =============================================================================
// Batch
// =============================================================================

/// The unit handed to the persistence capability.
///
/// Intended invariant: every `name` satisfies validation. Duplicate names are
/// flagged by the validation pipeline but not removed (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub clients: Vec<ClientDraft>,
    pub count: usize,
}

impl Batch {
    pub fn new(clients: Vec<ClientDraft>) -> Self {
        let count = clients.len();
        Self { clients, count }
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// =============================================================================
// Persisted Records
// =============================================================================

/// A client as returned by the persistence capability after bulk insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedClient {
    pub id: Uuid,
    #[serde(flatten)]
    pub draft: ClientDraft,
    pub registered_at: DateTime<Utc>,
}

/// A courier record fetched from a registered client's API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    /// The raw source record, kept for operator inspection.
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_wire_format_is_camel_case() {
        let mut draft = ClientDraft::named("Acme");
        draft.company_id = Some("C-1".into());
        draft.old_company_id = Some("C-0".into());

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["name"], "Acme");
        assert_eq!(value["companyId"], "C-1");
        assert_eq!(value["oldCompanyId"], "C-0");
        // Unset fields are omitted, not null.
        assert!(value.get("companyName").is_none());
        assert!(value.get("apiUrl").is_none());
    }

    #[test]
    fn test_draft_roundtrip() {
        let value = json!({
            "name": "Acme",
            "companyName": "Acme Corp",
            "types": ["retail", "b2b"],
            "apiUrl": "https://api.acme.test"
        });
        let draft: ClientDraft = serde_json::from_value(value).unwrap();
        assert_eq!(draft.name, "Acme");
        assert_eq!(draft.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(draft.types.as_deref(), Some(&["retail".to_string(), "b2b".to_string()][..]));
    }

    #[test]
    fn test_batch_count_matches_clients() {
        let batch = Batch::new(vec![ClientDraft::named("A"), ClientDraft::named("B")]);
        assert_eq!(batch.count, 2);
        assert!(!batch.is_empty());
        assert!(Batch::new(vec![]).is_empty());
    }
}
