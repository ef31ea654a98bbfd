//! High-level ingestion pipeline: the three paths from raw input to a
//! validated batch.
//!
//! - [`ingest_csv`] - pasted CSV blob
//! - [`ingest_json`] - pasted JSON blob
//! - [`ingest_api`] - paginated fetch against a remote API
//!
//! All three end in the same tail: extract one draft per record, validate,
//! and return an [`IngestOutcome`] with the batch and the ordered error list.

use serde_json::Value;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{FormatError, IngestResult, PipelineError};
use crate::models::Batch;
use crate::pagination::{self, FetchOptions, TerminationReason};
use crate::parser;
use crate::transform::extract::extract;
use crate::transform::shape::locate_records;
use crate::transport::{ClassifiedError, RequestSpec, Transport};
use crate::validation;

/// Result of one ingestion call.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Drafts that passed validation, in input order.
    pub batch: Batch,
    /// Ordered, human-readable error list (per-row failures, then batch-level
    /// advisories).
    pub errors: Vec<String>,
    /// Raw records seen before validation.
    pub records_seen: usize,
    /// Pages fetched (API path only).
    pub pages_fetched: Option<u32>,
    /// Why the traversal stopped (API path only).
    pub termination: Option<TerminationReason>,
    /// Classified transport error from a partial fetch (API path only,
    /// advisory - the accumulated records were kept).
    pub transport_error: Option<ClassifiedError>,
}

/// Ingest a pasted CSV blob.
pub fn ingest_csv(text: &str, api_url: Option<&str>) -> IngestResult<IngestOutcome> {
    log_info("Tokenizing CSV input...");
    let tokenized = parser::tokenize(text)?;
    log_success(format!(
        "{} columns, {} rows",
        tokenized.headers.len(),
        tokenized.rows.len()
    ));

    Ok(finish(tokenized.rows, api_url, None))
}

/// Ingest a pasted JSON blob.
pub fn ingest_json(text: &str, api_url: Option<&str>) -> IngestResult<IngestOutcome> {
    log_info("Parsing JSON input...");
    let payload: Value = serde_json::from_str(text).map_err(FormatError::from)?;

    let records = locate_records(&payload);
    if records.is_empty() {
        log_warning("No record collection found in payload");
        return Ok(IngestOutcome {
            batch: Batch::new(Vec::new()),
            errors: vec!["No records found in the JSON payload".to_string()],
            records_seen: 0,
            pages_fetched: None,
            termination: None,
            transport_error: None,
        });
    }
    log_success(format!("Located {} records", records.len()));

    Ok(finish(records, api_url, None))
}

/// Ingest from a remote API: paginated fetch, then the shared tail.
///
/// A failure on the very first page aborts with the classified error; a
/// failure on a later page keeps the accumulated records and surfaces the
/// classified error as an advisory on the outcome.
pub async fn ingest_api<T: Transport>(
    spec: &RequestSpec,
    transport: &T,
    options: &FetchOptions,
) -> IngestResult<IngestOutcome> {
    log_info(format!("Fetching clients from {}...", spec.url));
    let fetched = pagination::fetch_all(spec, transport, options).await;

    if fetched.reason == TerminationReason::InitialFetchFailed {
        let error = fetched.error.unwrap_or_else(|| {
            classify_unreachable(spec)
        });
        return Err(PipelineError::Fetch(error));
    }

    log_success(format!(
        "{} records across {} pages",
        fetched.records.len(),
        fetched.pages_fetched
    ));

    let mut outcome = finish(fetched.records, Some(&spec.url), Some(spec));
    outcome.pages_fetched = Some(fetched.pages_fetched);
    outcome.termination = Some(fetched.reason);
    outcome.transport_error = fetched.error;
    Ok(outcome)
}

/// Shared tail: extract, validate, report.
fn finish(records: Vec<Value>, api_url: Option<&str>, config: Option<&RequestSpec>) -> IngestOutcome {
    let records_seen = records.len();

    let drafts = records
        .iter()
        .map(|record| {
            let mut draft = extract(record, api_url);
            draft.request_config = config.cloned();
            draft
        })
        .collect();

    log_info("Validating drafts...");
    let report = validation::validate(drafts);
    if report.errors.is_empty() {
        log_success(format!("All {} drafts valid", report.valid.len()));
    } else {
        log_warning(format!(
            "{} valid, {} issues",
            report.valid.len(),
            report.errors.len()
        ));
    }

    IngestOutcome {
        batch: Batch::new(report.valid),
        errors: report.errors,
        records_seen,
        pages_fetched: None,
        termination: None,
        transport_error: None,
    }
}

/// Fallback classification when the engine reports an initial failure without
/// an attached error.
fn classify_unreachable(spec: &RequestSpec) -> ClassifiedError {
    use crate::transport::{classify, TransportFailure};
    classify(&TransportFailure::Other {
        hostname: spec.hostname(),
        message: "initial fetch failed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FailureCode, RawResponse, TransportFailure};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_csv_end_to_end() {
        let csv = "Company ID,Company Name\nCLI001,Client 1\nCLI002,Client 2";
        let outcome = ingest_csv(csv, None).unwrap();

        assert_eq!(outcome.batch.count, 2);
        assert_eq!(outcome.batch.clients[0].name, "Client 1");
        assert_eq!(outcome.batch.clients[1].name, "Client 2");
        assert_eq!(outcome.batch.clients[0].company_id.as_deref(), Some("CLI001"));
        assert_eq!(
            outcome.batch.clients[0].company_name.as_deref(),
            Some("Client 1")
        );
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records_seen, 2);
    }

    #[test]
    fn test_csv_invalid_header_is_format_error() {
        let err = ingest_csv("city,country\nBerlin,DE", None).unwrap_err();
        assert!(matches!(err, PipelineError::Format(_)));
    }

    #[test]
    fn test_csv_row_order_preserved() {
        let csv = "name\nZeta\nAlpha\nMidway";
        let outcome = ingest_csv(csv, None).unwrap();
        let names: Vec<&str> = outcome
            .batch
            .clients
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Midway"]);
    }

    #[test]
    fn test_json_prefers_clients_container() {
        let text = r#"{"data": [{"name": "wrong"}], "clients": [{"name": "right"}]}"#;
        let outcome = ingest_json(text, None).unwrap();
        assert_eq!(outcome.batch.count, 1);
        assert_eq!(outcome.batch.clients[0].name, "right");
    }

    #[test]
    fn test_json_without_records_is_empty_batch_with_message() {
        let outcome = ingest_json(r#"{"status": "ok"}"#, None).unwrap();
        assert!(outcome.batch.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("No records"));
    }

    #[test]
    fn test_json_malformed_is_format_error() {
        let err = ingest_json("{not json", None).unwrap_err();
        assert!(matches!(err, PipelineError::Format(FormatError::Json(_))));
    }

    #[test]
    fn test_json_api_url_stamped() {
        let outcome =
            ingest_json(r#"[{"name": "Acme"}]"#, Some("https://api.example.com")).unwrap();
        assert_eq!(
            outcome.batch.clients[0].api_url.as_deref(),
            Some("https://api.example.com")
        );
    }

    struct StubTransport {
        pages: Vec<Result<Value, TransportFailure>>,
        calls: AtomicUsize,
    }

    impl Transport for StubTransport {
        async fn send(&self, _: &RequestSpec) -> Result<RawResponse, TransportFailure> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.pages[idx] {
                Ok(payload) => Ok(RawResponse {
                    status: 200,
                    body: payload.to_string(),
                }),
                Err(failure) => Err(failure.clone()),
            }
        }
    }

    #[tokio::test]
    async fn test_api_path_stamps_url_and_config() {
        let transport = StubTransport {
            pages: vec![Ok(json!({"clients": [{"name": "Acme"}]}))],
            calls: AtomicUsize::new(0),
        };
        let spec = RequestSpec::get("https://api.example.com/clients");

        let outcome = ingest_api(&spec, &transport, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.batch.count, 1);
        let draft = &outcome.batch.clients[0];
        assert_eq!(draft.api_url.as_deref(), Some("https://api.example.com/clients"));
        assert_eq!(
            draft.request_config.as_ref().unwrap().url,
            "https://api.example.com/clients"
        );
        assert_eq!(outcome.termination, Some(TerminationReason::Complete));
    }

    #[tokio::test]
    async fn test_api_initial_failure_propagates_classified_error() {
        let transport = StubTransport {
            pages: vec![Err(TransportFailure::Connection {
                code: FailureCode::DnsNotFound,
                hostname: "api.example.com".into(),
                message: "dns".into(),
            })],
            calls: AtomicUsize::new(0),
        };
        let spec = RequestSpec::get("https://api.example.com/clients");

        let err = ingest_api(&spec, &transport, &FetchOptions::default())
            .await
            .unwrap_err();
        match err {
            PipelineError::Fetch(classified) => {
                assert!(classified.message.contains("api.example.com"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_api_partial_failure_keeps_accumulated_batch() {
        let transport = StubTransport {
            pages: vec![
                Ok(json!({"clients": [{"name": "Acme"}, {"name": "Globex"}], "hasNext": true})),
                Err(TransportFailure::Connection {
                    code: FailureCode::ConnectionReset,
                    hostname: "api.example.com".into(),
                    message: "reset".into(),
                }),
            ],
            calls: AtomicUsize::new(0),
        };
        let spec = RequestSpec::get("https://api.example.com/clients");

        let outcome = ingest_api(&spec, &transport, &FetchOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.batch.count, 2);
        assert_eq!(outcome.termination, Some(TerminationReason::PartialFetchFailed));
        assert!(outcome.transport_error.is_some());
    }
}
