//! Client draft validation.
//!
//! Per-draft rules run in a fixed order, first failure wins:
//!
//! 1. name normalization (trim, collapse whitespace runs) - never fails;
//! 2. empty name rejected;
//! 3. shorter than [`MIN_NAME_CHARS`] rejected;
//! 4. longer than [`MAX_NAME_CHARS`] rejected.
//!
//! After per-draft validation, duplicate normalized names across the batch
//! append a single advisory error without removing the duplicates from the
//! valid set (see DESIGN.md for the rationale).
//!
//! This module also validates operator-supplied request configuration against
//! a JSON Schema embedded at compile time from `schemas/request-spec.json`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::{ClientDraft, ValidationOutcome};

/// Minimum client name length, in characters.
pub const MIN_NAME_CHARS: usize = 2;

/// Maximum client name length, in characters.
pub const MAX_NAME_CHARS: usize = 100;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Result of validating a batch of drafts.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Drafts that passed per-draft validation, names normalized, in input
    /// order.
    pub valid: Vec<ClientDraft>,
    /// Human-readable errors: per-draft failures in input order, then the
    /// batch-level duplicate advisory if any.
    pub errors: Vec<String>,
}

/// Normalize a client name: trim, collapse internal whitespace runs to one
/// space. Never fails.
pub fn normalize_name(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Check one already-normalized name against the ordered rules.
pub fn check_name(name: &str) -> ValidationOutcome {
    if name.is_empty() {
        return ValidationOutcome::invalid(ValidationError::NameRequired.to_string());
    }
    let chars = name.chars().count();
    if chars < MIN_NAME_CHARS {
        return ValidationOutcome::invalid(
            ValidationError::NameTooShort {
                name: name.to_string(),
                min: MIN_NAME_CHARS,
            }
            .to_string(),
        );
    }
    if chars > MAX_NAME_CHARS {
        return ValidationOutcome::invalid(
            ValidationError::NameTooLong {
                name: name.to_string(),
                max: MAX_NAME_CHARS,
            }
            .to_string(),
        );
    }
    ValidationOutcome::valid()
}

/// Validate a batch of drafts.
pub fn validate(drafts: Vec<ClientDraft>) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (idx, mut draft) in drafts.into_iter().enumerate() {
        draft.name = normalize_name(&draft.name);
        let outcome = check_name(&draft.name);
        if outcome.is_valid {
            report.valid.push(draft);
        } else {
            report.errors.push(format!("Row {}: {}", idx + 1, outcome.message));
        }
    }

    let duplicates = duplicate_names(&report.valid);
    if !duplicates.is_empty() {
        report.errors.push(
            ValidationError::DuplicateNames {
                names: duplicates.join(", "),
            }
            .to_string(),
        );
    }

    report
}

/// Names occurring more than once among the passing drafts, in first-seen
/// order, each listed once.
fn duplicate_names(drafts: &[ClientDraft]) -> Vec<String> {
    let mut duplicates = Vec::new();
    for (idx, draft) in drafts.iter().enumerate() {
        let seen_before = drafts[..idx].iter().any(|d| d.name == draft.name);
        let seen_again = drafts[idx + 1..].iter().any(|d| d.name == draft.name);
        if !seen_before && seen_again {
            duplicates.push(draft.name.clone());
        }
    }
    duplicates
}

// =============================================================================
// Request spec schema validation
// =============================================================================

/// Validate a request configuration value against the embedded draft-7
/// schema.
pub fn validate_request_spec(spec: &Value) -> Result<(), ValidationError> {
    let schema: Value = serde_json::from_str(include_str!("../../schemas/request-spec.json"))
        .expect("Invalid embedded schema");

    let validator = jsonschema::draft7::new(&schema).map_err(|e| ValidationError::SchemaError {
        errors: vec![e.to_string()],
    })?;

    let errors: Vec<String> = validator.iter_errors(spec).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaError { errors })
    }
}

/// Quick check against the embedded request spec schema.
pub fn is_valid_request_spec(spec: &Value) -> bool {
    validate_request_spec(spec).is_ok()
}
