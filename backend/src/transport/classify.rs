//! Failure classification: opaque transport errors to actionable categories.
//!
//! The classifier inspects a failed transport attempt in priority order
//! (byte-ceiling overflow, then known connection codes, then the 502 gateway
//! status) and produces a fixed category with a human-oriented message and
//! remediation suggestions. An unrecognized failure shape always resolves to
//! [`FailureCategory::Unknown`]; classification never fails.

use serde::Serialize;
use thiserror::Error;

use super::{FailureCode, TransportFailure};

/// HTTP status treated as "the gateway reached the upstream but the upstream
/// was unreachable".
pub const UPSTREAM_UNREACHABLE_STATUS: u16 = 502;

/// Fixed set of failure categories, serialized with wire-compatible codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCategory {
    #[serde(rename = "RESPONSE_TOO_LARGE")]
    ResponseTooLarge,
    #[serde(rename = "ENOTFOUND")]
    DnsNotFound,
    #[serde(rename = "ECONNREFUSED")]
    ConnectionRefused,
    #[serde(rename = "ETIMEDOUT")]
    TimedOut,
    #[serde(rename = "ECONNRESET")]
    ConnectionReset,
    #[serde(rename = "UPSTREAM_UNREACHABLE")]
    UpstreamUnreachable,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            FailureCategory::ResponseTooLarge => "RESPONSE_TOO_LARGE",
            FailureCategory::DnsNotFound => "ENOTFOUND",
            FailureCategory::ConnectionRefused => "ECONNREFUSED",
            FailureCategory::TimedOut => "ETIMEDOUT",
            FailureCategory::ConnectionReset => "ECONNRESET",
            FailureCategory::UpstreamUnreachable => "UPSTREAM_UNREACHABLE",
            FailureCategory::Unknown => "UNKNOWN",
        };
        f.write_str(code)
    }
}

/// A classified failure: category, human-readable message, and remediation
/// suggestions. Derived, read-only.
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ClassifiedError {
    pub category: FailureCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub suggestions: Vec<String>,
}

/// Classify one transport failure.
pub fn classify(failure: &TransportFailure) -> ClassifiedError {
    match failure {
        TransportFailure::BodyTooLarge { hostname, limit } => ClassifiedError {
            category: FailureCategory::ResponseTooLarge,
            message: format!(
                "The response from {hostname} exceeded the {limit}-byte limit and was discarded"
            ),
            hostname: Some(hostname.clone()),
            suggestions: suggestions(&[
                "Add filters to the request so the API returns fewer records",
                "Use a paginated endpoint and fetch smaller pages",
                "Ask the API to return fewer fields per record",
            ]),
        },

        TransportFailure::Connection { code, hostname, .. } => classify_connection(*code, hostname),

        TransportFailure::Status { status, hostname }
            if *status == UPSTREAM_UNREACHABLE_STATUS =>
        {
            ClassifiedError {
                category: FailureCategory::UpstreamUnreachable,
                message: format!(
                    "The gateway could not reach {hostname}: the upstream service is unreachable"
                ),
                hostname: Some(hostname.clone()),
                suggestions: suggestions(&[
                    "Confirm the API service behind the gateway is running",
                    "Retry in a few minutes",
                ]),
            }
        }

        other => {
            let hostname = match other {
                TransportFailure::Status { hostname, .. } => Some(hostname.clone()),
                TransportFailure::Other { hostname, .. } => hostname.clone(),
                _ => None,
            };
            ClassifiedError {
                category: FailureCategory::Unknown,
                message: format!("The request failed: {other}"),
                hostname,
                suggestions: suggestions(&[
                    "Check the API URL and authentication settings",
                    "Retry the request",
                ]),
            }
        }
    }
}

fn classify_connection(code: FailureCode, hostname: &str) -> ClassifiedError {
    let (category, message, hints): (_, _, &[&str]) = match code {
        FailureCode::DnsNotFound => (
            FailureCategory::DnsNotFound,
            format!("Could not resolve the hostname {hostname}"),
            &[
                "Check the API URL for typos",
                "Confirm the hostname is reachable from this network",
            ],
        ),
        FailureCode::ConnectionRefused => (
            FailureCategory::ConnectionRefused,
            format!("{hostname} refused the connection"),
            &[
                "Confirm the API service is running and listening on this port",
                "Check firewall rules between this host and the API",
            ],
        ),
        FailureCode::TimedOut => (
            FailureCategory::TimedOut,
            format!("The request to {hostname} timed out"),
            &[
                "Retry the request",
                "Raise CLIENTLOAD_TIMEOUT_SECS if the API is known to be slow",
            ],
        ),
        FailureCode::ConnectionReset => (
            FailureCategory::ConnectionReset,
            format!("{hostname} reset the connection mid-response"),
            &[
                "Retry the request",
                "Check whether a proxy between this host and the API drops long responses",
            ],
        ),
    };

    ClassifiedError {
        category,
        message,
        hostname: Some(hostname.to_string()),
        suggestions: suggestions(hints),
    }
}

fn suggestions(hints: &[&str]) -> Vec<String> {
    hints.iter().map(|h| h.to_string()).collect()
}
