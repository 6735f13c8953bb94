//! HTTP handlers for pdfbrief-api.

pub mod documents;
pub mod downloads;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use pdfbrief_jobs::UploadLimits;

use crate::ApiError;

/// Fields collected from a PDF upload form.
#[derive(Debug, Default)]
pub(crate) struct PdfForm {
    pub file_name: String,
    pub data: Option<Vec<u8>>,
    pub mode: Option<String>,
}

fn multipart_error(e: MultipartError, limits: UploadLimits) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("file too large (max {}MB)", limits.max_upload_mb))
    } else {
        ApiError::BadRequest(format!("Multipart error: {}", e))
    }
}

/// Read the `file` and `mode` fields; other fields are ignored.
pub(crate) async fn read_pdf_form(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<PdfForm, ApiError> {
    let mut form = PdfForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                form.file_name = field.file_name().unwrap_or_default().to_string();
                form.data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| multipart_error(e, limits))?
                        .to_vec(),
                );
            }
            Some("mode") => {
                form.mode = Some(field.text().await.map_err(|e| multipart_error(e, limits))?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Malformed ids cannot name a document, so they read as not found.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("not found".to_string()))
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("invalid JSON".to_string()))
}
