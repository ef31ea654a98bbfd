//! Bounded, heuristic-driven pagination traversal.
//!
//! The engine walks a remote API page by page through the opaque transport
//! capability, without a fixed contract for how "more pages exist" is
//! signaled. Conceptually it is a state machine - `Fetching(n)` issues the
//! derived per-page request, `Deciding` evaluates the pagination signals,
//! and `Terminated(reason)` always hands back whatever was accumulated.
//!
//! Pages are fetched strictly sequentially: the next request and the
//! termination decision depend on the previous response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::transform::shape::locate_records;
use crate::transport::{classify, ClassifiedError, RequestSpec, Transport};

/// Hard upper bound on pages fetched per ingestion call.
/// Can be overridden via the CLIENTLOAD_PAGE_CAP environment variable.
pub const DEFAULT_PAGE_CAP: u32 = 10;

/// Records requested per page.
/// Can be overridden via the CLIENTLOAD_PAGE_SIZE environment variable.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Explicit page-count fields, probed in order. Dotted paths descend into
/// nested containers.
pub const TOTAL_PAGES_ALIASES: &[&str] = &[
    "pagination.total_pages",
    "pagination.totalPages",
    "total_pages",
    "totalPages",
];

/// Explicit next-page indicators, probed in order.
pub const NEXT_PAGE_ALIASES: &[&str] = &[
    "pagination.next_page",
    "pagination.hasNext",
    "next_page",
    "hasNext",
    "next_page_url",
];

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation handle, checked before each page fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Options and Outcome
// =============================================================================

/// Traversal configuration.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_size: usize,
    pub page_cap: u32,
    pub cancel: CancelToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_cap: DEFAULT_PAGE_CAP,
            cancel: CancelToken::new(),
        }
    }
}

impl FetchOptions {
    /// Read page size and cap from the environment, falling back to the
    /// defaults.
    pub fn from_env() -> Self {
        let page_size = std::env::var("CLIENTLOAD_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let page_cap = std::env::var("CLIENTLOAD_PAGE_CAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PAGE_CAP);
        Self {
            page_size,
            page_cap,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Why the traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No more pages were signaled.
    Complete,
    /// The hard page cap was the limiting factor.
    PageCapReached,
    /// The very first page failed; nothing was accumulated.
    InitialFetchFailed,
    /// A later page failed; earlier pages are preserved.
    PartialFetchFailed,
    /// The cancel token was raised between pages.
    Cancelled,
}

/// Traversal result. Always carries whatever records were accumulated, even
/// on partial failure - a non-`Complete` reason is advisory, not a request
/// to roll back.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    pub pages_fetched: u32,
    pub reason: TerminationReason,
    pub error: Option<ClassifiedError>,
}

// =============================================================================
// Traversal
// =============================================================================

/// Fetch every page the remote API signals, up to the hard page cap.
pub async fn fetch_all<T: Transport>(
    base: &RequestSpec,
    transport: &T,
    options: &FetchOptions,
) -> FetchOutcome {
    let mut records: Vec<Value> = Vec::new();
    let mut page: u32 = 1;

    loop {
        if options.cancel.is_cancelled() {
            log_warning(format!("Fetch cancelled before page {page}"));
            return FetchOutcome {
                records,
                pages_fetched: page - 1,
                reason: TerminationReason::Cancelled,
                error: None,
            };
        }

        let page_spec = page_request(base, page, options.page_size);
        log_info(format!("Fetching page {page}..."));

        let failure = match transport.send(&page_spec).await {
            Ok(response) => match response.json() {
                Ok(payload) => {
                    let page_records = locate_records(&payload);
                    let fetched = page_records.len();
                    records.extend(page_records);
                    log_success(format!("Page {page}: {fetched} records"));

                    // A zero-record page never signals more, whatever the
                    // payload claims.
                    let more = fetched > 0 && has_more(&payload, page, fetched, options.page_size);

                    if !more {
                        return FetchOutcome {
                            records,
                            pages_fetched: page,
                            reason: TerminationReason::Complete,
                            error: None,
                        };
                    }
                    if page >= options.page_cap {
                        log_warning(format!("Stopping at the {page}-page cap"));
                        return FetchOutcome {
                            records,
                            pages_fetched: page,
                            reason: TerminationReason::PageCapReached,
                            error: None,
                        };
                    }
                    page += 1;
                    continue;
                }
                Err(failure) => failure,
            },
            Err(failure) => failure,
        };

        let classified = classify(&failure);
        log_error(format!("Page {page} failed: {}", classified.message));
        let reason = if page == 1 {
            TerminationReason::InitialFetchFailed
        } else {
            TerminationReason::PartialFetchFailed
        };
        return FetchOutcome {
            records,
            pages_fetched: page - 1,
            reason,
            error: Some(classified),
        };
    }
}

/// Derive the request for one page: overlay the page number and size onto the
/// base query parameters.
fn page_request(base: &RequestSpec, page: u32, page_size: usize) -> RequestSpec {
    base.with_query_param("page", &page.to_string())
        .with_query_param("size", &page_size.to_string())
}

/// Descend a dotted alias path into the payload.
fn probe<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |value, segment| value.get(segment))
}

/// Evaluate the pagination signals in priority order: explicit page count,
/// then explicit next-page indicator, then the size heuristic.
fn has_more(payload: &Value, current_page: u32, fetched: usize, page_size: usize) -> bool {
    for alias in TOTAL_PAGES_ALIASES {
        if let Some(total) = probe(payload, alias).and_then(Value::as_u64) {
            return u64::from(current_page) < total;
        }
    }

    for alias in NEXT_PAGE_ALIASES {
        match probe(payload, alias) {
            Some(Value::Bool(more)) => return *more,
            Some(Value::Number(_)) => return true,
            Some(Value::String(url)) => return !url.is_empty(),
            // Null reads as "field present but no signal"; keep probing.
            _ => {}
        }
    }

    fetched == page_size
}
