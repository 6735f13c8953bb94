//! The terminal-transition step shared by background jobs and regeneration.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pdfbrief_core::{
    ArtifactStore, DocumentRepository, Error, Result, SummarizationBackend, SummaryOutcome,
};

use crate::handler::{JobHandler, JobResult, SummarizeJob};
use crate::locks::DocumentLocks;

/// Runs one summarization against the gateway and records the outcome.
///
/// Holds the document's lock across the gateway call and the status write,
/// so two attempts for the same document never overlap.
pub struct SummaryProcessor {
    repo: Arc<dyn DocumentRepository>,
    store: Arc<dyn ArtifactStore>,
    backend: Arc<dyn SummarizationBackend>,
    locks: DocumentLocks,
}

impl SummaryProcessor {
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        store: Arc<dyn ArtifactStore>,
        backend: Arc<dyn SummarizationBackend>,
    ) -> Self {
        Self {
            repo,
            store,
            backend,
            locks: DocumentLocks::new(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn DocumentRepository> {
        &self.repo
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn SummarizationBackend> {
        &self.backend
    }

    pub fn locks(&self) -> &DocumentLocks {
        &self.locks
    }

    /// Summarize the job's document and write `success` or `failed`.
    ///
    /// On failure the error is returned after it has been recorded on the
    /// summary. A record that vanished meanwhile (document deleted) is not an
    /// error; the outcome is simply dropped.
    pub async fn process(&self, job: &SummarizeJob) -> Result<SummaryOutcome> {
        let _guard = self.locks.acquire(job.pdf_id).await;
        let start = Instant::now();

        let attempt = match self.store.resolve_absolute(&job.stored_path) {
            Ok(path) => {
                self.backend
                    .summarize(&path.to_string_lossy(), job.mode)
                    .await
            }
            Err(e) => Err(e),
        };

        match attempt {
            Ok(outcome) => {
                let matched = self
                    .repo
                    .update_summary_success(job.pdf_id, &outcome.summary_text, outcome.process_time_ms)
                    .await?;
                self.log_unmatched(job.pdf_id, matched);
                info!(
                    subsystem = "jobs",
                    component = "processor",
                    op = "summarize",
                    pdf_id = %job.pdf_id,
                    job_id = %job.job_id,
                    mode = job.mode.as_str(),
                    process_time_ms = outcome.process_time_ms,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Summary succeeded"
                );
                Ok(outcome)
            }
            Err(e) => {
                let message = failure_message(&e);
                warn!(
                    subsystem = "jobs",
                    component = "processor",
                    op = "summarize",
                    pdf_id = %job.pdf_id,
                    job_id = %job.job_id,
                    mode = job.mode.as_str(),
                    error = %message,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Summary failed"
                );
                let matched = self.repo.update_summary_failed(job.pdf_id, &message).await?;
                self.log_unmatched(job.pdf_id, matched);
                Err(e)
            }
        }
    }

    fn log_unmatched(&self, pdf_id: Uuid, matched: bool) {
        if !matched {
            debug!(
                subsystem = "jobs",
                component = "processor",
                pdf_id = %pdf_id,
                "No summary record to update; document was deleted"
            );
        }
    }
}

/// Text stored in `error_message`: the gateway's own description when there is one.
pub fn failure_message(err: &Error) -> String {
    match err {
        Error::Gateway(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl JobHandler for SummaryProcessor {
    async fn execute(&self, job: SummarizeJob) -> JobResult {
        match self.process(&job).await {
            Ok(outcome) => JobResult::Success(outcome),
            Err(e) => JobResult::Failed(failure_message(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryDocumentRepository, MockSummarizer};
    use pdfbrief_core::{Document, SummaryMode, SummaryRecord, SummaryStatus};
    use pdfbrief_db::FilesystemArtifactStore;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        repo: Arc<InMemoryDocumentRepository>,
        backend: Arc<MockSummarizer>,
        processor: Arc<SummaryProcessor>,
        job: SummarizeJob,
    }

    async fn fixture(backend: MockSummarizer) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FilesystemArtifactStore::new(dir.path()));
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let backend = Arc::new(backend);

        let id = Uuid::now_v7();
        let stored_path = store.put(id, b"%PDF-1.4").await.unwrap();
        let doc = Document::new_pdf(id, "doc.pdf", stored_path.clone(), 8);
        repo.create_document_with_summary(&doc, &SummaryRecord::pending(Uuid::now_v7(), id))
            .await
            .unwrap();

        let processor = Arc::new(SummaryProcessor::new(
            repo.clone(),
            store,
            backend.clone(),
        ));
        Fixture {
            _dir: dir,
            repo,
            backend,
            processor,
            job: SummarizeJob::new(id, stored_path, SummaryMode::Short),
        }
    }

    #[tokio::test]
    async fn test_success_writes_summary() {
        let fx = fixture(MockSummarizer::new().with_summary("Short summary")).await;

        let outcome = fx.processor.process(&fx.job).await.unwrap();
        assert_eq!(outcome.summary_text, "Short summary");

        let rec = fx.repo.summary(fx.job.pdf_id).unwrap();
        assert_eq!(rec.status, SummaryStatus::Success);
        assert_eq!(rec.summary_text.as_deref(), Some("Short summary"));
        assert!(rec.process_time_ms.unwrap() >= 0);

        // The gateway received an absolute path and the requested mode.
        let calls = fx.backend.summarize_calls();
        assert_eq!(calls.len(), 1);
        assert!(std::path::Path::new(&calls[0].0).is_absolute());
        assert_eq!(calls[0].1, SummaryMode::Short);
    }

    #[tokio::test]
    async fn test_gateway_error_is_recorded_verbatim() {
        let fx = fixture(MockSummarizer::new().with_failure("connection refused")).await;

        let err = fx.processor.process(&fx.job).await.unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));

        let rec = fx.repo.summary(fx.job.pdf_id).unwrap();
        assert_eq!(rec.status, SummaryStatus::Failed);
        assert_eq!(rec.error_message.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_deleted_document_is_not_an_error() {
        let fx = fixture(MockSummarizer::new()).await;
        fx.repo.delete_document(fx.job.pdf_id).await.unwrap();

        assert!(fx.processor.process(&fx.job).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_maps_to_job_result() {
        let fx = fixture(MockSummarizer::new().with_failure("HTTP 502")).await;
        let result = fx.processor.execute(fx.job.clone()).await;
        assert_eq!(result, JobResult::Failed("HTTP 502".to_string()));
    }

    #[tokio::test]
    async fn test_attempts_on_one_document_never_overlap() {
        let fx = fixture(MockSummarizer::new().with_latency_ms(20)).await;

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let processor = fx.processor.clone();
            let job = fx.job.clone();
            tasks.push(tokio::spawn(async move { processor.process(&job).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fx.backend.summarize_calls().len(), 4);
        assert_eq!(fx.backend.max_concurrent(), 1);
        assert!(fx.processor.locks().is_empty());
    }

    #[test]
    fn test_failure_message_prefers_gateway_text() {
        assert_eq!(failure_message(&Error::Gateway("timeout".into())), "timeout");
        assert_eq!(
            failure_message(&Error::Internal("x".into())),
            "Internal error: x"
        );
    }
}
