//! # Clientload - bulk client ingestion and normalization
//!
//! Clientload lets an operator bulk-register clients into a directory from a
//! pasted CSV blob, a pasted JSON blob, or an arbitrary third-party HTTP API,
//! normalizing whatever shape comes back into canonical client records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ CSV/JSON/API │───▶│  Tokenize /  │───▶│  Extract +   │───▶│  Validated   │
//! │    input     │    │  Normalize   │    │  Validate    │    │    Batch     │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! The API path runs a bounded, heuristic pagination traversal in front of
//! the same normalize/extract/validate tail; transport failures anywhere are
//! turned into actionable categories by the error classifier.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clientload::transform::pipeline::ingest_csv;
//!
//! let outcome = ingest_csv("name\nAcme\nGlobex", None)?;
//! println!("Batch of {}", outcome.batch.count);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (ClientDraft, Batch, PersistedClient)
//! - [`parser`] - Hand-rolled CSV tokenizer with encoding auto-detection
//! - [`transform`] - Shape normalization, field aliases, record extraction,
//!   and the ingestion pipeline
//! - [`validation`] - Draft validation and request-spec schema checks
//! - [`transport`] - Transport capability, auth, and failure classification
//! - [`pagination`] - Bounded heuristic pagination traversal
//! - [`store`] - Persistence capability
//! - [`api`] - HTTP surface

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Normalization
pub mod transform;

// Validation
pub mod validation;

// Network
pub mod transport;
pub mod pagination;

// Persistence
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{FormatError, PipelineError, ServerError, StoreError, ValidationError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Batch, ClientDraft, Courier, PersistedClient, ValidationOutcome, UNKNOWN_CLIENT};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{decode_bytes, detect_encoding, tokenize, TokenizedCsv};

// =============================================================================
// Re-exports - Normalization
// =============================================================================

pub use transform::pipeline::{ingest_api, ingest_csv, ingest_json, IngestOutcome};
pub use transform::{extract, locate_records};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    check_name, is_valid_request_spec, normalize_name, validate, validate_request_spec,
    ValidationReport,
};

// =============================================================================
// Re-exports - Transport and Pagination
// =============================================================================

pub use transport::{
    classify, AuthConfig, ClassifiedError, FailureCategory, HttpTransport, KeyValuePair,
    RawResponse, RequestSpec, Transport, TransportFailure,
};

pub use pagination::{
    fetch_all, CancelToken, FetchOptions, FetchOutcome, TerminationReason, DEFAULT_PAGE_CAP,
    DEFAULT_PAGE_SIZE,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{ClientStore, InMemoryStore};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
