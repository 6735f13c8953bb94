//! Document lifecycle orchestration.
//!
//! The orchestrator owns the `pending -> success | failed` state machine:
//! upload stores the blob and a pending record, then hands summarization to
//! the worker; regeneration runs the same step synchronously; delete removes
//! rows first and the blob second.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use pdfbrief_core::defaults::PDF_EXTENSION;
use pdfbrief_core::{
    new_v7, AppConfig, ArtifactStore, DeleteOutcome, Document, DocumentDetail, DocumentListItem,
    DocumentRepository, Error, RemoveOutcome, Result, SummarizationBackend, SummaryMode,
    SummaryOutcome, SummaryRecord, UploadReceipt,
};

use crate::handler::SummarizeJob;
use crate::processor::{failure_message, SummaryProcessor};
use crate::worker::JobSubmitter;

/// A fully-read upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub data: Vec<u8>,
    pub mode: SummaryMode,
}

/// Upload acceptance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_upload_mb: u64,
}

impl UploadLimits {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_upload_mb: config.max_upload_mb,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Reject anything that is not a non-empty `.pdf` within the size limit.
    pub fn validate(&self, file_name: &str, size: usize) -> Result<()> {
        let is_pdf = Path::new(file_name.trim())
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(PDF_EXTENSION));
        if !is_pdf {
            return Err(Error::InvalidInput("only PDF files are allowed".to_string()));
        }
        if size == 0 {
            return Err(Error::InvalidInput("file is empty".to_string()));
        }
        if size as u64 > self.max_bytes() {
            return Err(Error::PayloadTooLarge {
                limit_mb: self.max_upload_mb,
            });
        }
        Ok(())
    }
}

/// Coordinates the repository, artifact store, gateway and worker.
#[derive(Clone)]
pub struct Orchestrator {
    processor: Arc<SummaryProcessor>,
    submitter: JobSubmitter,
    limits: UploadLimits,
}

impl Orchestrator {
    pub fn new(processor: Arc<SummaryProcessor>, submitter: JobSubmitter, limits: UploadLimits) -> Self {
        Self {
            processor,
            submitter,
            limits,
        }
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    fn repo(&self) -> &Arc<dyn DocumentRepository> {
        self.processor.repository()
    }

    fn store(&self) -> &Arc<dyn ArtifactStore> {
        self.processor.store()
    }

    fn backend(&self) -> &Arc<dyn SummarizationBackend> {
        self.processor.backend()
    }

    /// Store a new PDF and schedule its summary.
    ///
    /// Returns once the blob, the document row and the pending summary row
    /// exist. Summarization completes later; callers poll [`Self::get`].
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        self.limits.validate(&request.file_name, request.data.len())?;

        let id = new_v7();
        let stored_path = self.store().put(id, &request.data).await?;

        let doc = Document::new_pdf(
            id,
            request.file_name.trim(),
            stored_path.clone(),
            request.data.len() as i64,
        );
        let summary = SummaryRecord::pending(new_v7(), id);

        if let Err(e) = self.repo().create_document_with_summary(&doc, &summary).await {
            // No row references the blob, so it must not outlive this call.
            if let Err(cleanup) = self.store().remove(&stored_path).await {
                warn!(
                    subsystem = "lifecycle",
                    op = "upload",
                    pdf_id = %id,
                    stored_path = %stored_path,
                    error = %cleanup,
                    "Failed to remove orphaned blob"
                );
            }
            return Err(e);
        }

        info!(
            subsystem = "lifecycle",
            op = "upload",
            pdf_id = %id,
            size_bytes = doc.size_bytes,
            mode = request.mode.as_str(),
            "Document stored, summary pending"
        );

        let job = SummarizeJob::new(id, stored_path, request.mode);
        if let Err(e) = self.submitter.submit(job) {
            warn!(subsystem = "lifecycle", op = "upload", pdf_id = %id, error = %e, "Could not schedule summary");
            self.repo()
                .update_summary_failed(id, &failure_message(&e))
                .await?;
        }

        Ok(UploadReceipt::from(&doc))
    }

    /// Summarize again, synchronously, and return the new result.
    ///
    /// Any prior state is replaced directly by `success` or `failed`.
    pub async fn regenerate(&self, id: Uuid, mode: SummaryMode) -> Result<SummaryOutcome> {
        let detail = self
            .repo()
            .get_document_with_summary(id)
            .await?
            .ok_or(Error::DocumentNotFound(id))?;

        debug!(subsystem = "lifecycle", op = "regenerate", pdf_id = %id, mode = mode.as_str(), "Regenerating summary");
        let job = SummarizeJob::new(id, detail.document.stored_path, mode);
        self.processor.process(&job).await
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Result<Vec<DocumentListItem>> {
        self.repo().list_documents().await
    }

    pub async fn get(&self, id: Uuid) -> Result<DocumentDetail> {
        self.repo()
            .get_document_with_summary(id)
            .await?
            .ok_or(Error::DocumentNotFound(id))
    }

    /// Delete the document rows, then the blob.
    ///
    /// Once the rows are gone the deletion has succeeded; a blob that cannot
    /// be removed is only logged.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteOutcome> {
        let Some(stored_path) = self.repo().delete_document(id).await? else {
            return Ok(DeleteOutcome::NotFound);
        };

        match self.store().remove(&stored_path).await {
            Ok(RemoveOutcome::Removed) => {}
            Ok(RemoveOutcome::NotFound) => {
                debug!(subsystem = "lifecycle", op = "delete", pdf_id = %id, stored_path = %stored_path, "Blob already absent");
            }
            Err(e) => {
                warn!(
                    subsystem = "lifecycle",
                    op = "delete",
                    pdf_id = %id,
                    stored_path = %stored_path,
                    error = %e,
                    "Failed to remove blob"
                );
            }
        }

        info!(subsystem = "lifecycle", op = "delete", pdf_id = %id, "Document deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Extract preview text from a PDF without storing anything.
    pub async fn preview(&self, file_name: &str, data: &[u8]) -> Result<String> {
        self.limits.validate(file_name, data.len())?;
        self.backend().preview(file_name.trim(), data).await
    }

    /// Render summary text as a PDF document.
    pub async fn render_pdf(&self, summary: &str) -> Result<Vec<u8>> {
        self.backend().render_pdf(summary).await
    }

    /// Whether the summarizer service answers.
    pub async fn summarizer_healthy(&self) -> bool {
        self.backend().health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryDocumentRepository, MockSummarizer};
    use crate::worker::{SummaryWorker, WorkerConfig, WorkerEvent, WorkerHandle};
    use pdfbrief_core::SummaryStatus;
    use pdfbrief_db::FilesystemArtifactStore;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        repo: Arc<InMemoryDocumentRepository>,
        backend: Arc<MockSummarizer>,
        worker: WorkerHandle,
        orchestrator: Orchestrator,
    }

    impl Harness {
        fn new(backend: MockSummarizer) -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Arc::new(InMemoryDocumentRepository::new());
            let store = Arc::new(FilesystemArtifactStore::new(dir.path()));
            let backend = Arc::new(backend);
            let processor = Arc::new(SummaryProcessor::new(repo.clone(), store, backend.clone()));
            let worker = SummaryWorker::new(processor.clone(), WorkerConfig::default()).start();
            let orchestrator = Orchestrator::new(
                processor,
                worker.submitter(),
                UploadLimits { max_upload_mb: 1 },
            );
            Self {
                dir,
                repo,
                backend,
                worker,
                orchestrator,
            }
        }

        fn pdf_files(&self) -> usize {
            match std::fs::read_dir(self.dir.path().join("pdfs")) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }

        /// Wait until the worker reports the job for `pdf_id` as finished.
        async fn settle(&self, events: &mut tokio::sync::broadcast::Receiver<WorkerEvent>, pdf_id: Uuid) {
            loop {
                let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                    .await
                    .expect("worker event")
                    .expect("event channel open");
                match event {
                    WorkerEvent::JobCompleted { pdf_id: id, .. }
                    | WorkerEvent::JobFailed { pdf_id: id, .. }
                        if id == pdf_id =>
                    {
                        return
                    }
                    _ => {}
                }
            }
        }
    }

    fn upload(name: &str, size: usize, mode: SummaryMode) -> UploadRequest {
        UploadRequest {
            file_name: name.to_string(),
            data: vec![b'x'; size],
            mode,
        }
    }

    #[test]
    fn test_validate_extension_case_insensitive() {
        let limits = UploadLimits { max_upload_mb: 10 };
        assert!(limits.validate("Report.PDF", 10).is_ok());
        assert!(limits.validate("notes.txt", 10).is_err());
        assert!(limits.validate("pdf", 10).is_err());
        assert!(limits.validate("archive.pdf.zip", 10).is_err());
    }

    #[test]
    fn test_validate_size_bounds() {
        let limits = UploadLimits { max_upload_mb: 1 };
        assert!(limits.validate("a.pdf", 1024 * 1024).is_ok());
        assert!(matches!(
            limits.validate("a.pdf", 1024 * 1024 + 1),
            Err(Error::PayloadTooLarge { limit_mb: 1 })
        ));
        assert!(limits.validate("a.pdf", 0).unwrap_err().is_validation());
    }

    #[test]
    fn test_limits_follow_config_and_saturate() {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://x/y".to_string()),
            "MAX_UPLOAD_MB" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        let limits = UploadLimits::from_app_config(&config);
        assert_eq!(limits.max_bytes(), config.max_upload_bytes());

        let huge = UploadLimits {
            max_upload_mb: u64::MAX,
        };
        assert_eq!(huge.max_bytes(), u64::MAX);
        assert!(huge.validate("big.pdf", usize::MAX).is_ok());
    }

    #[tokio::test]
    async fn test_upload_then_background_summary_succeeds() {
        let h = Harness::new(MockSummarizer::new().with_summary("A concise summary."));
        let mut events = h.worker.events();

        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 1024, SummaryMode::Short))
            .await
            .unwrap();
        assert_eq!(receipt.original_name, "doc.pdf");
        assert_eq!(receipt.size_bytes, 1024);
        assert_eq!(receipt.stored_path, format!("pdfs/{}.pdf", receipt.id));

        h.settle(&mut events, receipt.id).await;

        let detail = h.orchestrator.get(receipt.id).await.unwrap();
        let summary = detail.summary.unwrap();
        assert_eq!(summary.status, SummaryStatus::Success);
        assert_eq!(summary.summary_text.as_deref(), Some("A concise summary."));
        assert!(summary.process_time_ms.unwrap() >= 0);
        assert_eq!(h.backend.summarize_calls()[0].1, SummaryMode::Short);
    }

    #[tokio::test]
    async fn test_upload_returns_with_single_pending_summary() {
        let h = Harness::new(MockSummarizer::new().with_latency_ms(200));
        let mut events = h.worker.events();

        let receipt = h
            .orchestrator
            .upload(upload("slow.pdf", 512, SummaryMode::Detailed))
            .await
            .unwrap();

        assert_eq!(h.repo.document_count(), 1);
        let summary = h.orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_eq!(summary.pdf_id, receipt.id);
        assert_eq!(summary.status, SummaryStatus::Pending);
        assert!(summary.summary_text.is_none());
        assert!(summary.process_time_ms.is_none());
        assert!(summary.error_message.is_none());

        h.settle(&mut events, receipt.id).await;

        let summary = h.orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_ne!(summary.status, SummaryStatus::Pending);
        assert_eq!(h.repo.document_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_round_trips_metadata() {
        let h = Harness::new(MockSummarizer::new());
        let receipt = h
            .orchestrator
            .upload(upload("paper.pdf", 2048, SummaryMode::Detailed))
            .await
            .unwrap();

        let doc = h.orchestrator.get(receipt.id).await.unwrap().document;
        assert_eq!(doc.original_name, "paper.pdf");
        assert_eq!(doc.size_bytes, 2048);
        assert_eq!(doc.mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_rejected_uploads_leave_no_trace() {
        let h = Harness::new(MockSummarizer::new());

        let err = h
            .orchestrator
            .upload(upload("notes.txt", 10, SummaryMode::Detailed))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: only PDF files are allowed");

        let err = h
            .orchestrator
            .upload(upload("big.pdf", 1024 * 1024 + 1, SummaryMode::Detailed))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PayloadTooLarge { .. }));

        assert_eq!(h.repo.document_count(), 0);
        assert_eq!(h.pdf_files(), 0);
        assert!(h.backend.summarize_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_removes_blob() {
        let h = Harness::new(MockSummarizer::new());
        h.repo.fail_next_create();

        let result = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await;
        assert!(result.is_err());
        assert_eq!(h.repo.document_count(), 0);
        assert_eq!(h.pdf_files(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_marks_summary_failed() {
        let h = Harness::new(MockSummarizer::new().with_failure("summarizer returned 500"));
        let mut events = h.worker.events();

        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        h.settle(&mut events, receipt.id).await;

        let summary = h.orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_eq!(summary.status, SummaryStatus::Failed);
        assert_eq!(summary.error_message.as_deref(), Some("summarizer returned 500"));
        assert!(summary.summary_text.is_none());
    }

    #[tokio::test]
    async fn test_stopped_worker_marks_summary_failed() {
        let h = Harness::new(MockSummarizer::new());
        let Harness {
            dir: _dir,
            worker,
            orchestrator,
            ..
        } = h;
        worker.shutdown().await.unwrap();

        let receipt = orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        let summary = orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_eq!(summary.status, SummaryStatus::Failed);
        assert!(summary.error_message.unwrap().contains("stopped"));
    }

    #[tokio::test]
    async fn test_regenerate_failure_keeps_prior_summary() {
        let h = Harness::new(MockSummarizer::new().with_summary("first"));
        let mut events = h.worker.events();
        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        h.settle(&mut events, receipt.id).await;

        h.backend
            .set_failure(Some("error sending request: connection refused".to_string()));
        let err = h
            .orchestrator
            .regenerate(receipt.id, SummaryMode::Bullet)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));

        let summary = h.orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_eq!(summary.status, SummaryStatus::Failed);
        assert!(summary
            .error_message
            .unwrap()
            .contains("connection refused"));
        assert_eq!(summary.summary_text.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_regenerate_success_returns_outcome() {
        let h = Harness::new(MockSummarizer::new().with_failure("down"));
        let mut events = h.worker.events();
        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        h.settle(&mut events, receipt.id).await;

        h.backend.set_failure(None);
        let outcome = h
            .orchestrator
            .regenerate(receipt.id, SummaryMode::Bullet)
            .await
            .unwrap();
        assert!(outcome.summary_text.starts_with("bullet summary of"));

        let summary = h.orchestrator.get(receipt.id).await.unwrap().summary.unwrap();
        assert_eq!(summary.status, SummaryStatus::Success);
        assert!(summary.error_message.is_none());
    }

    #[tokio::test]
    async fn test_regenerate_unknown_document() {
        let h = Harness::new(MockSummarizer::new());
        let err = h
            .orchestrator
            .regenerate(Uuid::now_v7(), SummaryMode::Detailed)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(h.backend.summarize_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_rows_and_blob() {
        let h = Harness::new(MockSummarizer::new());
        let mut events = h.worker.events();
        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        h.settle(&mut events, receipt.id).await;
        assert_eq!(h.pdf_files(), 1);

        assert_eq!(
            h.orchestrator.delete(receipt.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(h.pdf_files(), 0);
        assert!(h.orchestrator.get(receipt.id).await.unwrap_err().is_not_found());

        assert_eq!(
            h.orchestrator.delete(receipt.id).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_still_succeeds() {
        let h = Harness::new(MockSummarizer::new());
        let mut events = h.worker.events();
        let receipt = h
            .orchestrator
            .upload(upload("doc.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        h.settle(&mut events, receipt.id).await;
        std::fs::remove_file(h.dir.path().join(&receipt.stored_path)).unwrap();

        assert_eq!(
            h.orchestrator.delete(receipt.id).await.unwrap(),
            DeleteOutcome::Deleted
        );
    }

    #[tokio::test]
    async fn test_list_newest_first_and_idempotent() {
        let h = Harness::new(MockSummarizer::new());
        let first = h
            .orchestrator
            .upload(upload("one.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = h
            .orchestrator
            .upload(upload("two.pdf", 10, SummaryMode::Detailed))
            .await
            .unwrap();

        let a = h.orchestrator.list().await.unwrap();
        let b = h.orchestrator.list().await.unwrap();
        let ids: Vec<Uuid> = a.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(
            ids,
            b.iter().map(|i| i.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_preview_validates_and_forwards() {
        let h = Harness::new(MockSummarizer::new());
        assert_eq!(
            h.orchestrator.preview("doc.pdf", b"%PDF").await.unwrap(),
            "preview of 4 bytes"
        );
        assert!(h
            .orchestrator
            .preview("doc.docx", b"x")
            .await
            .unwrap_err()
            .is_validation());
        assert_eq!(h.pdf_files(), 0);
    }

    #[tokio::test]
    async fn test_render_pdf_forwards() {
        let h = Harness::new(MockSummarizer::new());
        let pdf = h.orchestrator.render_pdf("hello").await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(h.orchestrator.summarizer_healthy().await);
    }
}
