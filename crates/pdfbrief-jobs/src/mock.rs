//! In-memory collaborators for deterministic tests.
//!
//! Enabled with the `mock` feature (always on under `cfg(test)`).
//!
//! ```rust,ignore
//! use pdfbrief_jobs::mock::{InMemoryDocumentRepository, MockSummarizer};
//!
//! let repo = Arc::new(InMemoryDocumentRepository::new());
//! let backend = Arc::new(MockSummarizer::new().with_summary("Fixed summary"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use pdfbrief_core::{
    Document, DocumentDetail, DocumentListItem, DocumentRepository, Error, Result,
    SummarizationBackend, SummaryMode, SummaryOutcome, SummaryRecord,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// HashMap-backed [`DocumentRepository`].
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    rows: Mutex<HashMap<Uuid, (Document, Option<SummaryRecord>)>>,
    fail_next_create: AtomicBool,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_document_with_summary` fail without writing.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }

    pub fn document_count(&self) -> usize {
        lock(&self.rows).len()
    }

    pub fn summary(&self, pdf_id: Uuid) -> Option<SummaryRecord> {
        lock(&self.rows).get(&pdf_id).and_then(|(_, s)| s.clone())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create_document(&self, doc: &Document) -> Result<()> {
        let mut rows = lock(&self.rows);
        if rows.contains_key(&doc.id) {
            return Err(Error::Internal(format!("duplicate document id {}", doc.id)));
        }
        rows.insert(doc.id, (doc.clone(), None));
        Ok(())
    }

    async fn create_pending_summary(&self, summary: &SummaryRecord) -> Result<()> {
        let mut rows = lock(&self.rows);
        let entry = rows
            .get_mut(&summary.pdf_id)
            .ok_or(Error::DocumentNotFound(summary.pdf_id))?;
        if entry.1.is_some() {
            return Err(Error::Internal("summary already exists".into()));
        }
        entry.1 = Some(summary.clone());
        Ok(())
    }

    async fn create_document_with_summary(
        &self,
        doc: &Document,
        summary: &SummaryRecord,
    ) -> Result<()> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(Error::Internal("simulated insert failure".into()));
        }
        let mut rows = lock(&self.rows);
        if rows.contains_key(&doc.id) {
            return Err(Error::Internal(format!("duplicate document id {}", doc.id)));
        }
        rows.insert(doc.id, (doc.clone(), Some(summary.clone())));
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentListItem>> {
        let rows = lock(&self.rows);
        let mut items: Vec<DocumentListItem> = rows
            .values()
            .map(|(doc, summary)| DocumentListItem {
                id: doc.id,
                original_name: doc.original_name.clone(),
                size_bytes: doc.size_bytes,
                created_at: doc.created_at,
                status: summary.as_ref().map(|s| s.status),
                process_time_ms: summary.as_ref().and_then(|s| s.process_time_ms),
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn get_document_with_summary(&self, id: Uuid) -> Result<Option<DocumentDetail>> {
        Ok(lock(&self.rows)
            .get(&id)
            .map(|(document, summary)| DocumentDetail {
                document: document.clone(),
                summary: summary.clone(),
            }))
    }

    async fn update_summary_success(
        &self,
        pdf_id: Uuid,
        summary_text: &str,
        process_time_ms: i32,
    ) -> Result<bool> {
        let mut rows = lock(&self.rows);
        match rows.get_mut(&pdf_id).and_then(|(_, s)| s.as_mut()) {
            Some(rec) => {
                rec.mark_success(summary_text.to_string(), process_time_ms);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_summary_failed(&self, pdf_id: Uuid, error_message: &str) -> Result<bool> {
        let mut rows = lock(&self.rows);
        match rows.get_mut(&pdf_id).and_then(|(_, s)| s.as_mut()) {
            Some(rec) => {
                rec.mark_failed(error_message.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<String>> {
        Ok(lock(&self.rows).remove(&id).map(|(doc, _)| doc.stored_path))
    }
}

// =============================================================================
// SUMMARIZER
// =============================================================================

/// Scriptable [`SummarizationBackend`] that records every call.
#[derive(Default)]
pub struct MockSummarizer {
    summary: Mutex<Option<String>>,
    failure: Mutex<Option<String>>,
    latency_ms: u64,
    calls: Mutex<Vec<(String, SummaryMode)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_summary(self, text: impl Into<String>) -> Self {
        *lock(&self.summary) = Some(text.into());
        self
    }

    /// Fail every call with `Error::Gateway(message)`.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.set_failure(Some(message.into()));
        self
    }

    pub fn with_latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Switch failure mode on or off between calls.
    pub fn set_failure(&self, message: Option<String>) {
        *lock(&self.failure) = message;
    }

    /// `(absolute_path, mode)` of every summarize call so far.
    pub fn summarize_calls(&self) -> Vec<(String, SummaryMode)> {
        lock(&self.calls).clone()
    }

    /// Highest number of summarize calls observed running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn failure(&self) -> Option<Error> {
        lock(&self.failure).clone().map(Error::Gateway)
    }
}

#[async_trait]
impl SummarizationBackend for MockSummarizer {
    async fn summarize(&self, absolute_path: &str, mode: SummaryMode) -> Result<SummaryOutcome> {
        lock(&self.calls).push((absolute_path.to_string(), mode));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let started = Instant::now();
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failure() {
            return Err(err);
        }
        let text = lock(&self.summary)
            .clone()
            .unwrap_or_else(|| format!("{} summary of {}", mode, absolute_path));
        Ok(SummaryOutcome {
            summary_text: text,
            process_time_ms: i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX),
        })
    }

    async fn preview(&self, _file_name: &str, data: &[u8]) -> Result<String> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(format!("preview of {} bytes", data.len()))
    }

    async fn render_pdf(&self, summary: &str) -> Result<Vec<u8>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(summary.as_bytes());
        Ok(pdf)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.failure().is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let repo = InMemoryDocumentRepository::new();
        let mut older = Document::new_pdf(Uuid::now_v7(), "a.pdf", "pdfs/a.pdf", 1);
        older.created_at = older.created_at - chrono::Duration::minutes(5);
        let newer = Document::new_pdf(Uuid::now_v7(), "b.pdf", "pdfs/b.pdf", 1);
        repo.create_document(&older).await.unwrap();
        repo.create_document(&newer).await.unwrap();

        let items = repo.list_documents().await.unwrap();
        assert_eq!(items[0].id, newer.id);
        assert_eq!(items[1].id, older.id);
        assert!(items.iter().all(|i| i.status.is_none()));
    }

    #[tokio::test]
    async fn test_pending_summary_requires_document() {
        let repo = InMemoryDocumentRepository::new();
        let rec = SummaryRecord::pending(Uuid::now_v7(), Uuid::now_v7());
        assert!(repo.create_pending_summary(&rec).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mock_summarizer_failure_toggle() {
        let mock = MockSummarizer::new().with_failure("down");
        assert!(mock.summarize("/x.pdf", SummaryMode::Short).await.is_err());
        mock.set_failure(None);
        let out = mock.summarize("/x.pdf", SummaryMode::Short).await.unwrap();
        assert_eq!(out.summary_text, "short summary of /x.pdf");
        assert_eq!(mock.summarize_calls().len(), 2);
    }
}
