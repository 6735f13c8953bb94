//! Summarization job definition and the handler seam used by the worker.

use async_trait::async_trait;
use uuid::Uuid;

use pdfbrief_core::{SummaryMode, SummaryOutcome};

/// One unit of summarization work.
///
/// Carries everything needed to run without going back to the request:
/// the mode is resolved before the job is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizeJob {
    pub job_id: Uuid,
    pub pdf_id: Uuid,
    /// Artifact store path of the uploaded PDF.
    pub stored_path: String,
    pub mode: SummaryMode,
}

impl SummarizeJob {
    pub fn new(pdf_id: Uuid, stored_path: impl Into<String>, mode: SummaryMode) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            pdf_id,
            stored_path: stored_path.into(),
            mode,
        }
    }
}

/// Result of job execution.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    Success(SummaryOutcome),
    /// The summary record was marked failed with this message.
    Failed(String),
}

/// Executes summarization jobs for the worker.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, job: SummarizeJob) -> JobResult;
}
