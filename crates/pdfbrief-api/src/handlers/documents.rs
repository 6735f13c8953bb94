//! Document lifecycle handlers: upload, list, get, delete, regenerate, preview.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pdfbrief_core::{DeleteOutcome, DocumentDetail, DocumentListItem, SummaryMode, UploadReceipt};
use pdfbrief_jobs::UploadRequest;

use super::{parse_id, read_pdf_form};
use crate::{ApiError, AppState};

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub stored_path: String,
    pub uploaded_at: String,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            id: receipt.id.to_string(),
            original_name: receipt.original_name,
            size_bytes: receipt.size_bytes,
            stored_path: receipt.stored_path,
            uploaded_at: rfc3339(receipt.uploaded_at),
        }
    }
}

/// Upload a PDF and schedule its summary.
///
/// # Multipart Fields
/// - `file`: PDF file (required)
/// - `mode`: `short`, `detailed` or `bullet` (optional, also accepted as `?mode=`)
///
/// # Returns
/// - 201 Created with the stored document metadata
/// - 400 Bad Request if the file is missing, empty or not a PDF
/// - 413 Payload Too Large if the file exceeds `MAX_UPLOAD_MB`
pub async fn upload_pdf(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let limits = state.orchestrator.limits();
    let form = read_pdf_form(multipart, limits).await?;

    let data = form
        .data
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let mode = SummaryMode::resolve(form.mode.as_deref().or(query.mode.as_deref()))?;

    let receipt = state
        .orchestrator
        .upload(UploadRequest {
            file_name: form.file_name,
            data,
            mode,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(receipt))))
}

#[derive(Debug, Serialize)]
pub struct ListItemResponse {
    pub id: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub created_at: String,
    pub summary_status: String,
    pub process_time_ms: i32,
}

impl From<DocumentListItem> for ListItemResponse {
    fn from(item: DocumentListItem) -> Self {
        Self {
            id: item.id.to_string(),
            original_name: item.original_name,
            size_bytes: item.size_bytes,
            created_at: rfc3339(item.created_at),
            summary_status: item
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            process_time_ms: item.process_time_ms.unwrap_or(0),
        }
    }
}

/// List all documents, newest first.
pub async fn list_pdfs(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListItemResponse>>, ApiError> {
    let items = state.orchestrator.list().await?;
    Ok(Json(items.into_iter().map(ListItemResponse::from).collect()))
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    pub original_name: String,
    pub stored_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SummaryResponse {
    pub status: String,
    pub summary_text: String,
    pub process_time_ms: i32,
    pub error_message: String,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub file: FileResponse,
    pub summary: SummaryResponse,
}

impl From<DocumentDetail> for DetailResponse {
    fn from(detail: DocumentDetail) -> Self {
        let doc = detail.document;
        let summary = detail
            .summary
            .map(|s| SummaryResponse {
                status: s.status.as_str().to_string(),
                summary_text: s.summary_text.unwrap_or_default(),
                process_time_ms: s.process_time_ms.unwrap_or(0),
                error_message: s.error_message.unwrap_or_default(),
            })
            .unwrap_or_default();

        Self {
            file: FileResponse {
                id: doc.id.to_string(),
                original_name: doc.original_name,
                stored_path: doc.stored_path,
                size_bytes: doc.size_bytes,
                mime_type: doc.mime_type,
                created_at: rfc3339(doc.created_at),
                updated_at: rfc3339(doc.updated_at),
            },
            summary,
        }
    }
}

/// Get one document with its summary state.
pub async fn get_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetailResponse>, ApiError> {
    let id = parse_id(&id)?;
    let detail = state.orchestrator.get(id).await?;
    Ok(Json(DetailResponse::from(detail)))
}

/// Delete a document, its summary and its stored file.
///
/// # Returns
/// - 204 No Content on success
/// - 404 Not Found if there was nothing to delete
pub async fn delete_pdf(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    match state.orchestrator.delete(id).await? {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::NotFound => Err(ApiError::NotFound("not found".to_string())),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub pdf_id: String,
    pub summary_text: String,
    pub process_time_ms: i32,
}

/// Summarize a stored document again and wait for the result.
///
/// The body `{"mode": "..."}` is optional; an empty or unreadable body
/// summarizes in the default mode.
pub async fn regenerate_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let id = parse_id(&id)?;

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RegenerateRequest::default()
    } else {
        serde_json::from_slice::<RegenerateRequest>(&body).unwrap_or_else(|e| {
            debug!(pdf_id = %id, error = %e, "Ignoring malformed regenerate body");
            RegenerateRequest::default()
        })
    };
    let mode = SummaryMode::resolve(request.mode.as_deref())?;

    let outcome = state
        .orchestrator
        .regenerate(id, mode)
        .await
        .map_err(|e| ApiError::opaque(e, "failed to generate summary"))?;

    Ok(Json(RegenerateResponse {
        pdf_id: id.to_string(),
        summary_text: outcome.summary_text,
        process_time_ms: outcome.process_time_ms,
    }))
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub preview_text: String,
}

/// Extract preview text from a PDF without storing it.
pub async fn preview_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let form = read_pdf_form(multipart, state.orchestrator.limits()).await?;
    let data = form
        .data
        .ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;

    let preview_text = state
        .orchestrator
        .preview(&form.file_name, &data)
        .await
        .map_err(|e| ApiError::opaque(e, "failed to generate preview"))?;

    Ok(Json(PreviewResponse { preview_text }))
}
