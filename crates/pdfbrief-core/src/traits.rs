//! Core traits for pdfbrief abstractions.
//!
//! These traits define the seams between the lifecycle orchestrator and its
//! collaborators (relational store, blob store, remote summarizer), enabling
//! pluggable backends and testability.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Repository over document metadata and summary records.
///
/// Dropping a returned future cancels the underlying query.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a document row. Fails on duplicate id.
    async fn create_document(&self, doc: &Document) -> Result<()>;

    /// Insert a summary record in the `pending` state.
    async fn create_pending_summary(&self, summary: &SummaryRecord) -> Result<()>;

    /// Insert a document and its pending summary in one transaction.
    async fn create_document_with_summary(
        &self,
        doc: &Document,
        summary: &SummaryRecord,
    ) -> Result<()>;

    /// All documents, newest first, with their summary status (if any).
    async fn list_documents(&self) -> Result<Vec<DocumentListItem>>;

    /// Fetch a document and its summary record.
    async fn get_document_with_summary(&self, id: Uuid) -> Result<Option<DocumentDetail>>;

    /// Mark the summary successful. Returns `false` if no summary row matched.
    async fn update_summary_success(
        &self,
        pdf_id: Uuid,
        summary_text: &str,
        process_time_ms: i32,
    ) -> Result<bool>;

    /// Mark the summary failed. Returns `false` if no summary row matched.
    async fn update_summary_failed(&self, pdf_id: Uuid, error_message: &str) -> Result<bool>;

    /// Delete a document (cascading its summary) and return its stored path.
    async fn delete_document(&self, id: Uuid) -> Result<Option<String>>;
}

// =============================================================================
// ARTIFACT STORE
// =============================================================================

/// Outcome of removing a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Durable blob storage for uploaded PDF bytes.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store bytes for a document and return the stored path (relative to the store root).
    async fn put(&self, id: Uuid, data: &[u8]) -> Result<String>;

    /// Remove a stored blob. A missing blob is not an error.
    async fn remove(&self, path: &str) -> Result<RemoveOutcome>;

    /// Resolve a stored path to an absolute filesystem path.
    fn resolve_absolute(&self, path: &str) -> Result<PathBuf>;
}

// =============================================================================
// SUMMARIZATION BACKEND
// =============================================================================

/// Client for the remote summarization / preview / render service.
///
/// Implementations perform exactly one remote call per invocation and never
/// retry; every failure (non-2xx, timeout, transport) is an error.
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// Summarize the PDF at an absolute path.
    async fn summarize(&self, absolute_path: &str, mode: SummaryMode) -> Result<SummaryOutcome>;

    /// Extract preview text from raw PDF bytes.
    async fn preview(&self, file_name: &str, data: &[u8]) -> Result<String>;

    /// Render summary text into a PDF.
    async fn render_pdf(&self, summary: &str) -> Result<Vec<u8>>;

    /// Check whether the service is reachable.
    async fn health_check(&self) -> Result<bool>;
}
