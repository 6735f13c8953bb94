//! # pdfbrief-api
//!
//! HTTP surface for pdfbrief. Every route is a thin adapter over
//! [`pdfbrief_jobs::Orchestrator`]; no lifecycle decision is made here.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

use pdfbrief_core::defaults::MULTIPART_OVERHEAD_BYTES;
use pdfbrief_core::Error;
use pdfbrief_jobs::{Orchestrator, UploadLimits};

pub mod handlers;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// Error returned by handlers, rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// Message is shown to the client as-is; details are logged, never sent.
    Internal(String),
}

impl ApiError {
    /// Map an orchestrator error, replacing server-side failures with `message`.
    pub fn opaque(err: Error, message: &str) -> Self {
        match err {
            Error::NotFound(_)
            | Error::DocumentNotFound(_)
            | Error::InvalidInput(_)
            | Error::PayloadTooLarge { .. }
            | Error::Serialization(_) => ApiError::from(err),
            other => {
                error!(error = %other, "{}", message);
                ApiError::Internal(message.to_string())
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) | Error::DocumentNotFound(_) => {
                ApiError::NotFound("not found".to_string())
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::PayloadTooLarge { limit_mb } => {
                ApiError::PayloadTooLarge(format!("file too large (max {}MB)", limit_mb))
            }
            Error::Serialization(_) => ApiError::BadRequest("invalid JSON".to_string()),
            other => {
                error!(error = %other, "Request failed");
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Parse configured CORS origins, skipping invalid entries.
pub fn parse_allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

async fn health_check(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let summarizer = if state.orchestrator.summarizer_healthy().await {
        "up"
    } else {
        "down"
    };
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "summarizer": summarizer,
    }))
}

/// Request body limit: the upload maximum plus multipart framing.
pub fn body_limit(limits: UploadLimits) -> usize {
    usize::try_from(limits.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

/// Build the application router with all middleware.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let body_limit = body_limit(state.orchestrator.limits());

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/pdfs",
            post(handlers::documents::upload_pdf).get(handlers::documents::list_pdfs),
        )
        .route("/api/pdfs/preview", post(handlers::documents::preview_pdf))
        .route(
            "/api/pdfs/:id",
            get(handlers::documents::get_pdf).delete(handlers::documents::delete_pdf),
        )
        .route(
            "/api/pdfs/:id/summary",
            post(handlers::documents::regenerate_summary),
        )
        .route("/api/download/txt", post(handlers::downloads::download_txt))
        .route("/api/download/pdf", post(handlers::downloads::download_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins(allowed_origins)))
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .with_state(state)
}
