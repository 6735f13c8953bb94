//! Summary download handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::parse_json;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub summary: String,
}

/// Return the summary as a plain-text attachment.
pub async fn download_txt(body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let request: DownloadRequest = parse_json(&body)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=summary.txt"),
        ],
        request.summary,
    ))
}

/// Render the summary through the summarizer service and return the PDF.
pub async fn download_pdf(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: DownloadRequest = parse_json(&body)?;
    let pdf = state
        .orchestrator
        .render_pdf(&request.summary)
        .await
        .map_err(|e| ApiError::opaque(e, "failed to generate PDF"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=summary.pdf"),
        ],
        pdf,
    ))
}
