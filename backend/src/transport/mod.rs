//! Transport capability: the opaque `send(RequestSpec) -> RawResponse` seam.
//!
//! The ingestion core never talks to the network directly; it drives a
//! [`Transport`] implementation. The production implementation is
//! [`HttpTransport`] (reqwest with a builder-configured timeout and a
//! response byte ceiling); tests substitute in-memory stubs.

pub mod classify;

use std::error::Error as _;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use classify::{classify, ClassifiedError, FailureCategory};

/// Default request timeout in seconds.
/// Can be overridden via the CLIENTLOAD_TIMEOUT_SECS environment variable.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default response byte ceiling.
/// Can be overridden via the CLIENTLOAD_MAX_RESPONSE_BYTES environment
/// variable.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// Request Specification
// =============================================================================

/// A key/value pair used for both headers and query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Where an API key credential is placed on the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Authentication configuration attached to a request spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    Jwt {
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Apikey {
        api_key: String,
        api_key_name: String,
        api_key_location: ApiKeyLocation,
    },
}

/// Everything needed for one HTTP attempt. Immutable per attempt: the
/// pagination engine derives per-page specs by overlaying query parameters
/// onto a clone, never mutating the base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Vec<KeyValuePair>,
    #[serde(default)]
    pub query_params: Vec<KeyValuePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

impl RequestSpec {
    /// A GET spec for a bare URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            auth: None,
        }
    }

    /// Clone this spec with one query parameter replaced or appended.
    pub fn with_query_param(&self, key: &str, value: &str) -> Self {
        let mut derived = self.clone();
        match derived.query_params.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.value = value.to_string(),
            None => derived.query_params.push(KeyValuePair::new(key, value)),
        }
        derived
    }

    /// Best-effort hostname for error messages.
    pub fn hostname(&self) -> Option<String> {
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }
}

// =============================================================================
// Responses and Failures
// =============================================================================

/// A successful (2xx) transport response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Decode the body as JSON.
    pub fn json(&self) -> Result<Value, TransportFailure> {
        serde_json::from_str(&self.body).map_err(|e| TransportFailure::InvalidPayload {
            message: e.to_string(),
        })
    }
}

/// Best-effort transport failure code, mirroring the wire-level codes the
/// classifier recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCode {
    #[serde(rename = "ENOTFOUND")]
    DnsNotFound,
    #[serde(rename = "ECONNREFUSED")]
    ConnectionRefused,
    #[serde(rename = "ETIMEDOUT")]
    TimedOut,
    #[serde(rename = "ECONNRESET")]
    ConnectionReset,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            FailureCode::DnsNotFound => "ENOTFOUND",
            FailureCode::ConnectionRefused => "ECONNREFUSED",
            FailureCode::TimedOut => "ETIMEDOUT",
            FailureCode::ConnectionReset => "ECONNRESET",
        };
        f.write_str(code)
    }
}

/// A failed transport attempt, with enough context for classification.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    /// Response body exceeded the configured byte ceiling.
    #[error("Response from {hostname} exceeded {limit} bytes")]
    BodyTooLarge { hostname: String, limit: usize },

    /// Connection-level failure with a best-effort code.
    #[error("{code} while contacting {hostname}: {message}")]
    Connection {
        code: FailureCode,
        hostname: String,
        message: String,
    },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from {hostname}")]
    Status { status: u16, hostname: String },

    /// The response body was not decodable.
    #[error("Invalid response payload: {message}")]
    InvalidPayload { message: String },

    /// Anything else.
    #[error("Request failed: {message}")]
    Other {
        hostname: Option<String>,
        message: String,
    },
}

// =============================================================================
// Transport trait
// =============================================================================

/// The opaque network capability consumed by the ingestion core.
pub trait Transport: Send + Sync {
    /// Perform one HTTP attempt described by `spec`.
    fn send(
        &self,
        spec: &RequestSpec,
    ) -> impl Future<Output = Result<RawResponse, TransportFailure>> + Send;
}

// =============================================================================
// Production transport (reqwest)
// =============================================================================

/// reqwest-backed [`Transport`] with a request timeout and a response byte
/// ceiling.
pub struct HttpTransport {
    client: reqwest::Client,
    max_response_bytes: usize,
}

impl HttpTransport {
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportFailure::Other {
                hostname: None,
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_response_bytes,
        })
    }

    /// Create a transport from environment variables, falling back to the
    /// defaults.
    pub fn from_env() -> Result<Self, TransportFailure> {
        let timeout_secs = std::env::var("CLIENTLOAD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_response_bytes = std::env::var("CLIENTLOAD_MAX_RESPONSE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RESPONSE_BYTES);

        Self::new(Duration::from_secs(timeout_secs), max_response_bytes)
    }

    fn map_error(error: reqwest::Error, hostname: &str) -> TransportFailure {
        let message = error.to_string();

        if error.is_timeout() {
            return TransportFailure::Connection {
                code: FailureCode::TimedOut,
                hostname: hostname.to_string(),
                message,
            };
        }

        // Probe the source chain for IO-level detail.
        let mut source: Option<&(dyn std::error::Error + 'static)> = error.source();
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                let code = match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => Some(FailureCode::ConnectionRefused),
                    std::io::ErrorKind::ConnectionReset => Some(FailureCode::ConnectionReset),
                    std::io::ErrorKind::TimedOut => Some(FailureCode::TimedOut),
                    _ => None,
                };
                if let Some(code) = code {
                    return TransportFailure::Connection {
                        code,
                        hostname: hostname.to_string(),
                        message,
                    };
                }
            }
            let text = err.to_string().to_lowercase();
            if text.contains("dns") || text.contains("failed to lookup") {
                return TransportFailure::Connection {
                    code: FailureCode::DnsNotFound,
                    hostname: hostname.to_string(),
                    message,
                };
            }
            source = err.source();
        }

        if error.is_connect() {
            return TransportFailure::Connection {
                code: FailureCode::ConnectionRefused,
                hostname: hostname.to_string(),
                message,
            };
        }

        TransportFailure::Other {
            hostname: Some(hostname.to_string()),
            message,
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<RawResponse, TransportFailure> {
        let hostname = spec.hostname().unwrap_or_else(|| spec.url.clone());

        let method = reqwest::Method::from_bytes(spec.method.to_uppercase().as_bytes()).map_err(
            |_| TransportFailure::Other {
                hostname: Some(hostname.clone()),
                message: format!("Unsupported HTTP method: {}", spec.method),
            },
        )?;

        let mut request = self.client.request(method, &spec.url);

        for header in &spec.headers {
            request = request.header(&header.key, &header.value);
        }

        let query: Vec<(&str, &str)> = spec
            .query_params
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();
        if !query.is_empty() {
            request = request.query(&query);
        }

        match &spec.auth {
            Some(AuthConfig::Basic { username, password }) => {
                request = request.basic_auth(username, Some(password));
            }
            Some(AuthConfig::Bearer { token }) | Some(AuthConfig::Jwt { token }) => {
                request = request.bearer_auth(token);
            }
            Some(AuthConfig::Apikey {
                api_key,
                api_key_name,
                api_key_location,
            }) => match api_key_location {
                ApiKeyLocation::Header => {
                    request = request.header(api_key_name, api_key);
                }
                ApiKeyLocation::Query => {
                    request = request.query(&[(api_key_name.as_str(), api_key.as_str())]);
                }
            },
            Some(AuthConfig::None) | None => {}
        }

        if let Some(body) = &spec.body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_error(e, &hostname))?;

        let status = response.status();

        if let Some(length) = response.content_length() {
            if length as usize > self.max_response_bytes {
                return Err(TransportFailure::BodyTooLarge {
                    hostname,
                    limit: self.max_response_bytes,
                });
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, &hostname))?;

        if body.len() > self.max_response_bytes {
            return Err(TransportFailure::BodyTooLarge {
                hostname,
                limit: self.max_response_bytes,
            });
        }

        if !status.is_success() {
            return Err(TransportFailure::Status {
                status: status.as_u16(),
                hostname,
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}
