//! Error types for the Clientload ingestion pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`FormatError`] - malformed CSV/JSON input
//! - [`ValidationError`] - per-record validation failures
//! - [`StoreError`] - persistence capability failures
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Transport-level failures live in [`crate::transport::TransportFailure`]
//! next to the code that produces them. Error conversion is automatic via
//! `From` implementations, allowing `?` to work across error boundaries.

use thiserror::Error;
use uuid::Uuid;

use crate::transport::{ClassifiedError, TransportFailure};

// =============================================================================
// Format Errors (CSV / JSON input)
// =============================================================================

/// Errors raised while tokenizing or decoding raw input.
///
/// Format errors are locally recoverable: the caller reports the message to
/// the operator and no partial batch is produced.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input contained zero non-blank lines.
    #[error("Input is empty")]
    EmptyInput,

    /// Header row has no recognized client-name column.
    #[error("No recognized client name column in header: {0}")]
    NoNameHeader(String),

    /// A data line's field count disagrees with the header's.
    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Input is not valid JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors during client draft validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Name was empty after normalization.
    #[error("Client name is required")]
    NameRequired,

    /// Name shorter than the minimum length.
    #[error("Client name \"{name}\" must be at least {min} characters")]
    NameTooShort { name: String, min: usize },

    /// Name longer than the maximum length.
    #[error("Client name \"{name}\" must be at most {max} characters")]
    NameTooLong { name: String, max: usize },

    /// Two or more drafts in the batch normalized to the same name.
    #[error("Duplicate client names: {names}")]
    DuplicateNames { names: String },

    /// JSON Schema validation failed.
    #[error("Request configuration is invalid: {}", errors.join("; "))]
    SchemaError { errors: Vec<String> },
}

// =============================================================================
// Store Errors (persistence capability)
// =============================================================================

/// Errors from the persistence capability.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No stored client with this id.
    #[error("Client not found: {0}")]
    UnknownClient(Uuid),

    /// A client has no API URL to fetch courier data from.
    #[error("Client {0} has no API URL configured")]
    MissingApiUrl(Uuid),

    /// Courier fetch against the client's API failed outright.
    #[error("Courier fetch failed: {0}")]
    Fetch(ClassifiedError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level ingestion orchestration errors.
///
/// This is the main error type returned by the functions in
/// [`crate::transform::pipeline`]. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Transport failure before any page was fetched.
    #[error("Fetch failed: {0}")]
    Fetch(ClassifiedError),

    /// Raw transport failure outside the pagination loop.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportFailure),

    /// Validation failure.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO error (file-based CLI paths).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP surface errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for tokenizing/decoding operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Result type for pipeline operations.
pub type IngestResult<T> = Result<T, PipelineError>;

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // FormatError -> PipelineError
        let format_err = FormatError::EmptyInput;
        let pipeline_err: PipelineError = format_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ValidationError -> PipelineError
        let validation_err = ValidationError::NameRequired;
        let pipeline_err: PipelineError = validation_err.into();
        assert!(pipeline_err.to_string().contains("required"));

        // PipelineError -> ServerError
        let server_err: ServerError = PipelineError::Format(FormatError::EmptyInput).into();
        assert!(server_err.to_string().contains("Pipeline error"));
    }

    #[test]
    fn test_field_count_mismatch_format() {
        let err = FormatError::FieldCountMismatch {
            line: 4,
            expected: 3,
            found: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("Line 4"));
        assert!(msg.contains("expected 3"));
        assert!(msg.contains("found 5"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::NameTooShort {
            name: "x".into(),
            min: 2,
        };
        assert!(err.to_string().contains("must be at least 2 characters"));

        let err = ValidationError::DuplicateNames {
            names: "Acme, Globex".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Duplicate client names"));
        assert!(msg.contains("Acme"));
    }
}
