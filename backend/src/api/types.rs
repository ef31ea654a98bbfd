//! REST API types for the ingestion surface.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::ClientDraft;
use crate::pagination::TerminationReason;
use crate::transform::pipeline::IngestOutcome;
use crate::transport::{ClassifiedError, RequestSpec};

// =============================================================================
// Requests
// =============================================================================

/// Pasted-blob ingestion request (CSV or JSON text).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasteIngestRequest {
    pub text: String,
    #[serde(default)]
    pub api_url: Option<String>,
}

/// API ingestion request: a raw request spec plus traversal overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIngestRequest {
    /// Raw request configuration; schema-validated before deserialization so
    /// the operator gets field-level messages instead of a serde error.
    pub request: Value,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// Batch registration request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRegisterRequest {
    pub clients: Vec<ClientDraft>,
}

/// Courier fetch trigger for one registered client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierFetchRequest {
    pub api_url: String,
    #[serde(default)]
    pub request_config: Option<RequestSpec>,
}

// =============================================================================
// Responses
// =============================================================================

/// Response for every ingestion path: the validated batch plus metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Unique job identifier.
    pub job_id: String,

    /// "ready" when nothing needs operator attention, "warning" otherwise.
    pub status: String,

    /// Validated client drafts, ready for registration.
    pub clients: Vec<ClientDraft>,

    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub total_clients: usize,
    pub records_seen: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_fetched: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReason>,
    /// Ordered validation errors (per-row failures, then batch advisories).
    pub errors: Vec<String>,
    /// Advisory transport error from a partial fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_error: Option<ClassifiedError>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        let clean = outcome.errors.is_empty() && outcome.transport_error.is_none();

        IngestResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if clean { "ready" } else { "warning" }.to_string(),
            clients: outcome.batch.clients,
            metadata: ResponseMetadata {
                total_clients: outcome.batch.count,
                records_seen: outcome.records_seen,
                pages_fetched: outcome.pages_fetched,
                termination: outcome.termination,
                errors: outcome.errors,
                transport_error: outcome.transport_error,
            },
        }
    }
}

/// Connection test response: a one-page probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResponse {
    pub status: u16,
    pub records_located: usize,
    /// First located record, for operator eyeballing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Value>,
}

/// Create a plain error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "clients": [],
    })
}

/// Create an error response body carrying a classified transport error, so
/// the UI can render the suggestions and a retry affordance.
pub fn classified_error_response(error: &ClassifiedError) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error.message,
        "classified": error,
        "clients": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Batch;
    use crate::transport::{classify, FailureCode, TransportFailure};

    fn outcome(errors: Vec<String>) -> IngestOutcome {
        IngestOutcome {
            batch: Batch::new(vec![ClientDraft::named("Acme")]),
            errors,
            records_seen: 1,
            pages_fetched: Some(2),
            termination: Some(TerminationReason::Complete),
            transport_error: None,
        }
    }

    #[test]
    fn test_clean_outcome_is_ready() {
        let response: IngestResponse = outcome(vec![]).into();
        assert_eq!(response.status, "ready");
        assert_eq!(response.metadata.total_clients, 1);
        assert_eq!(response.metadata.pages_fetched, Some(2));
    }

    #[test]
    fn test_outcome_with_errors_is_warning() {
        let response: IngestResponse = outcome(vec!["Row 2: bad".into()]).into();
        assert_eq!(response.status, "warning");
        assert_eq!(response.metadata.errors.len(), 1);
    }

    #[test]
    fn test_classified_error_response_carries_suggestions() {
        let classified = classify(&TransportFailure::Connection {
            code: FailureCode::DnsNotFound,
            hostname: "api.example.com".into(),
            message: "dns".into(),
        });
        let body = classified_error_response(&classified);
        assert_eq!(body["status"], "error");
        assert_eq!(body["classified"]["category"], "ENOTFOUND");
        assert!(body["classified"]["suggestions"].as_array().unwrap().len() > 0);
    }

    #[test]
    fn test_wire_naming_is_camel_case() {
        let response: IngestResponse = outcome(vec![]).into();
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("jobId").is_some());
        assert!(value["metadata"].get("totalClients").is_some());
        assert!(value["metadata"].get("recordsSeen").is_some());
    }
}
