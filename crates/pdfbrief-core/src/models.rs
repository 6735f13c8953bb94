//! Domain models for uploaded documents and their summaries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// SUMMARY STATUS
// =============================================================================

/// Processing status of a document's summary.
///
/// `Pending` is only ever the initial state. `Success` and `Failed` are
/// terminal: the record leaves them only through an explicit regeneration,
/// which moves it straight to another terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Pending,
    Success,
    Failed,
}

impl SummaryStatus {
    /// Database / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Pending => "pending",
            SummaryStatus::Success => "success",
            SummaryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SummaryStatus::Pending),
            "success" => Ok(SummaryStatus::Success),
            "failed" => Ok(SummaryStatus::Failed),
            other => Err(Error::Internal(format!("unknown summary status: {}", other))),
        }
    }
}

// =============================================================================
// SUMMARY MODE
// =============================================================================

/// Summary style requested from the summarizer service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Roughly 150 words.
    Short,
    /// Roughly 300-400 words (default).
    #[default]
    Detailed,
    /// Five to eight bullet points.
    Bullet,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Short => "short",
            SummaryMode::Detailed => "detailed",
            SummaryMode::Bullet => "bullet",
        }
    }

    /// Resolve an optional, possibly empty mode string.
    ///
    /// Missing or blank values fall back to [`SummaryMode::Detailed`]; any
    /// other unknown value is rejected.
    pub fn resolve(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(SummaryMode::default()),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(SummaryMode::Short),
            "detailed" => Ok(SummaryMode::Detailed),
            "bullet" => Ok(SummaryMode::Bullet),
            other => Err(Error::InvalidInput(format!(
                "unknown summary mode '{}' (expected short, detailed or bullet)",
                other
            ))),
        }
    }
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// Metadata for one uploaded PDF. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub original_name: String,
    /// Path relative to the artifact store root.
    pub stored_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Build a new PDF document record stamped with the current time.
    pub fn new_pdf(
        id: Uuid,
        original_name: impl Into<String>,
        stored_path: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            original_name: original_name.into(),
            stored_path: stored_path.into(),
            size_bytes,
            mime_type: defaults::PDF_MIME_TYPE.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// SUMMARY RECORD
// =============================================================================

/// Status and result of summarizing one document (1:1 with [`Document`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub status: SummaryStatus,
    pub summary_text: Option<String>,
    pub process_time_ms: Option<i32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Changes only on a status transition.
    pub updated_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// Initial record for a freshly uploaded document.
    pub fn pending(id: Uuid, pdf_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            pdf_id,
            status: SummaryStatus::Pending,
            summary_text: None,
            process_time_ms: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a successful summarization.
    pub fn mark_success(&mut self, summary_text: String, process_time_ms: i32) {
        self.status = SummaryStatus::Success;
        self.summary_text = Some(summary_text);
        self.process_time_ms = Some(process_time_ms);
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Apply a failed summarization.
    ///
    /// A summary text from an earlier success is kept.
    pub fn mark_failed(&mut self, error_message: String) {
        self.status = SummaryStatus::Failed;
        self.error_message = Some(error_message);
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// PROJECTIONS
// =============================================================================

/// Row of the document listing (document left-joined with its summary status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListItem {
    pub id: Uuid,
    pub original_name: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    /// `None` when the summary row has not landed yet.
    pub status: Option<SummaryStatus>,
    pub process_time_ms: Option<i32>,
}

/// A document together with its summary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub summary: Option<SummaryRecord>,
}

/// Successful result returned by the summarizer service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutcome {
    pub summary_text: String,
    pub process_time_ms: i32,
}

/// Metadata returned to the client right after an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub original_name: String,
    pub size_bytes: i64,
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for UploadReceipt {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            original_name: doc.original_name.clone(),
            size_bytes: doc.size_bytes,
            stored_path: doc.stored_path.clone(),
            uploaded_at: doc.created_at,
        }
    }
}

/// Result of deleting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete; not an error.
    NotFound,
}
