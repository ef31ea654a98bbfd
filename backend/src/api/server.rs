//! HTTP server for the Clientload ingestion API.
//!
//! # API Endpoints
//!
//! | Method | Path                          | Description                          |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/health`                     | Health check                         |
//! | POST   | `/api/ingest/csv`             | Pasted CSV blob to batch             |
//! | POST   | `/api/ingest/json`            | Pasted JSON blob to batch            |
//! | POST   | `/api/connection/test`        | One-page probe of a request spec     |
//! | POST   | `/api/ingest/api`             | Full paginated fetch to batch        |
//! | POST   | `/api/clients/bulk`           | Persist a batch via the store        |
//! | POST   | `/api/clients/{id}/couriers`  | Trigger courier fetch for one client |
//! | GET    | `/api/logs`                   | SSE stream for real-time logs        |

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::Value;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::LOG_BROADCASTER;
use super::types::{
    classified_error_response, error_response, ApiIngestRequest, BulkRegisterRequest,
    ConnectionTestResponse, CourierFetchRequest, IngestResponse, PasteIngestRequest,
};
use crate::error::{PipelineError, StoreError};
use crate::pagination::FetchOptions;
use crate::store::{ClientStore, InMemoryStore};
use crate::transform::pipeline::{ingest_api, ingest_csv, ingest_json};
use crate::transform::shape::locate_records;
use crate::transport::{classify, HttpTransport, RequestSpec, Transport};
use crate::validation::validate_request_spec;

type ErrorReply = (StatusCode, Json<Value>);

/// Shared server state: one transport for ingestion probes, one store with
/// its own transport for courier fetches.
pub struct AppState {
    transport: HttpTransport,
    store: InMemoryStore<HttpTransport>,
}

/// Start the HTTP server.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        transport: HttpTransport::from_env()?,
        store: InMemoryStore::new(HttpTransport::from_env()?),
    });

    // Permissive CORS for the operator UI.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/ingest/csv", post(ingest_csv_handler))
        .route("/api/ingest/json", post(ingest_json_handler))
        .route("/api/connection/test", post(connection_test_handler))
        .route("/api/ingest/api", post(ingest_api_handler))
        .route("/api/clients/bulk", post(bulk_register_handler))
        .route("/api/clients/{id}/couriers", post(courier_fetch_handler))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("Clientload server running on http://localhost:{}", port);
    println!("   POST /api/ingest/csv        - Ingest pasted CSV");
    println!("   POST /api/ingest/json       - Ingest pasted JSON");
    println!("   POST /api/ingest/api        - Ingest from a remote API");
    println!("   POST /api/connection/test   - Test an API connection");
    println!("   GET  /api/logs              - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clientload",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// SSE endpoint for real-time log streaming.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Ingest a pasted CSV blob.
async fn ingest_csv_handler(
    Json(request): Json<PasteIngestRequest>,
) -> Result<Json<IngestResponse>, ErrorReply> {
    let outcome = ingest_csv(&request.text, request.api_url.as_deref())
        .map_err(|e| bad_request(&e.to_string()))?;
    Ok(Json(outcome.into()))
}

/// Ingest a pasted JSON blob.
async fn ingest_json_handler(
    Json(request): Json<PasteIngestRequest>,
) -> Result<Json<IngestResponse>, ErrorReply> {
    let outcome = ingest_json(&request.text, request.api_url.as_deref())
        .map_err(|e| bad_request(&e.to_string()))?;
    Ok(Json(outcome.into()))
}

/// Probe the first page of a request spec and report what was found.
async fn connection_test_handler(
    State(state): State<Arc<AppState>>,
    Json(raw_spec): Json<Value>,
) -> Result<Json<ConnectionTestResponse>, ErrorReply> {
    let spec = parse_spec(&raw_spec)?;

    let probe = spec
        .with_query_param("page", "1")
        .with_query_param("size", "5");

    let response = match state.transport.send(&probe).await {
        Ok(response) => response,
        Err(failure) => {
            let classified = classify(&failure);
            return Err((
                StatusCode::BAD_GATEWAY,
                Json(classified_error_response(&classified)),
            ));
        }
    };

    let records = response
        .json()
        .map(|payload| locate_records(&payload))
        .unwrap_or_default();

    Ok(Json(ConnectionTestResponse {
        status: response.status,
        records_located: records.len(),
        sample: records.into_iter().next(),
    }))
}

/// Run the full paginated ingestion against a remote API.
async fn ingest_api_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ApiIngestRequest>,
) -> Result<Json<IngestResponse>, ErrorReply> {
    let spec = parse_spec(&request.request)?;

    let mut options = FetchOptions::from_env();
    if let Some(page_size) = request.page_size {
        options = options.with_page_size(page_size);
    }

    match ingest_api(&spec, &state.transport, &options).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(PipelineError::Fetch(classified)) => Err((
            StatusCode::BAD_GATEWAY,
            Json(classified_error_response(&classified)),
        )),
        Err(other) => Err(bad_request(&other.to_string())),
    }
}

/// Persist a reviewed batch through the store capability.
///
/// Per-draft validation failures block registration; the duplicate-name
/// advisory does not, matching the ingestion pipeline's behavior.
async fn bulk_register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkRegisterRequest>,
) -> Result<Json<Value>, ErrorReply> {
    let submitted = request.clients.len();
    let report = crate::validation::validate(request.clients);

    if report.valid.len() != submitted {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "status": "error",
                "error": "Validation failed",
                "errors": report.errors,
            })),
        ));
    }

    let persisted = state
        .store
        .add_clients_in_bulk(report.valid)
        .await
        .map_err(|e| internal(&e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "registered": persisted.len(),
        "clients": persisted,
        "warnings": report.errors,
    })))
}

/// Trigger a courier fetch for one registered client.
async fn courier_fetch_handler(
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<CourierFetchRequest>,
) -> Result<Json<Value>, ErrorReply> {
    let couriers = state
        .store
        .fetch_and_store_courier_data(
            client_id,
            &request.api_url,
            request.request_config.as_ref(),
        )
        .await
        .map_err(|e| match e {
            StoreError::UnknownClient(_) => {
                (StatusCode::NOT_FOUND, Json(error_response(&e.to_string())))
            }
            StoreError::Fetch(classified) => (
                StatusCode::BAD_GATEWAY,
                Json(classified_error_response(&classified)),
            ),
            other => internal(&other.to_string()),
        })?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "stored": couriers.len(),
        "couriers": couriers,
    })))
}

/// Schema-validate then deserialize an operator-supplied request spec.
fn parse_spec(raw: &Value) -> Result<RequestSpec, ErrorReply> {
    validate_request_spec(raw).map_err(|e| bad_request(&e.to_string()))?;
    serde_json::from_value(raw.clone()).map_err(|e| bad_request(&e.to_string()))
}

fn bad_request(message: &str) -> ErrorReply {
    (StatusCode::BAD_REQUEST, Json(error_response(message)))
}

fn internal(message: &str) -> ErrorReply {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(message)))
}
