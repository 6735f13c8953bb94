//! Supervised background worker for summarization jobs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pdfbrief_core::defaults::{EVENT_BUS_CAPACITY, JOB_MAX_CONCURRENT, JOB_QUEUE_CAPACITY};
use pdfbrief_core::{AppConfig, Error, Result};

use crate::handler::{JobHandler, JobResult, SummarizeJob};

/// Configuration for the summary worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Maximum number of jobs running at once.
    pub max_concurrent_jobs: usize,
    /// Maximum number of accepted jobs waiting to run.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: JOB_MAX_CONCURRENT,
            queue_capacity: JOB_QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::default()
            .with_max_concurrent(config.job_max_concurrent)
            .with_queue_capacity(config.job_queue_capacity)
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

/// Event emitted by the summary worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    JobStarted { job_id: Uuid, pdf_id: Uuid },
    JobCompleted { job_id: Uuid, pdf_id: Uuid },
    JobFailed { job_id: Uuid, pdf_id: Uuid, error: String },
    WorkerStarted,
    WorkerStopped,
}

/// Cloneable sender side of the job queue.
#[derive(Clone)]
pub struct JobSubmitter {
    job_tx: mpsc::Sender<SummarizeJob>,
    in_flight: Arc<AtomicUsize>,
}

impl JobSubmitter {
    /// Enqueue a job without waiting.
    ///
    /// Fails with [`Error::Job`] when the queue is full or the worker has
    /// stopped; the caller decides what that means for the summary.
    pub fn submit(&self, job: SummarizeJob) -> Result<()> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        match self.job_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Err(match e {
                    mpsc::error::TrySendError::Full(_) => {
                        Error::Job("summary queue full".to_string())
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        Error::Job("summary worker stopped".to_string())
                    }
                })
            }
        }
    }

    /// Jobs accepted but not yet finished (queued plus running).
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    submitter: JobSubmitter,
    shutdown_tx: mpsc::Sender<()>,
    event_tx: broadcast::Sender<WorkerEvent>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn submitter(&self) -> JobSubmitter {
        self.submitter.clone()
    }

    pub fn submit(&self, job: SummarizeJob) -> Result<()> {
        self.submitter.submit(job)
    }

    pub fn in_flight(&self) -> usize {
        self.submitter.in_flight()
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Stop accepting jobs, run what is already queued, and wait for all of it.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("summary worker task failed: {}", e)))
    }
}

/// Decrements the in-flight counter even if the job panics.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Worker that owns summarization jobs independently of the requests that created them.
pub struct SummaryWorker {
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
}

impl SummaryWorker {
    pub fn new(handler: Arc<dyn JobHandler>, config: WorkerConfig) -> Self {
        Self { handler, config }
    }

    /// Start the dispatcher and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (job_tx, job_rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let in_flight = Arc::new(AtomicUsize::new(0));

        let dispatcher = Dispatcher {
            handler: self.handler,
            semaphore: Arc::new(Semaphore::new(self.config.max_concurrent_jobs)),
            event_tx: event_tx.clone(),
            in_flight: in_flight.clone(),
            tasks: JoinSet::new(),
        };
        let config = self.config;
        let task = tokio::spawn(dispatcher.run(config, job_rx, shutdown_rx));

        WorkerHandle {
            submitter: JobSubmitter { job_tx, in_flight },
            shutdown_tx,
            event_tx,
            task,
        }
    }
}

struct Dispatcher {
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
    event_tx: broadcast::Sender<WorkerEvent>,
    in_flight: Arc<AtomicUsize>,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    async fn run(
        mut self,
        config: WorkerConfig,
        mut job_rx: mpsc::Receiver<SummarizeJob>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!(
            subsystem = "jobs",
            component = "worker",
            max_concurrent = config.max_concurrent_jobs,
            queue_capacity = config.queue_capacity,
            "Summary worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!(subsystem = "jobs", component = "worker", "Summary worker received shutdown signal");
                    break;
                }
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    log_join_result(result);
                }
                maybe_job = job_rx.recv() => match maybe_job {
                    Some(job) => self.dispatch(job).await,
                    None => break,
                },
            }
        }

        // Drain: nothing new is accepted, but everything already queued still runs.
        job_rx.close();
        let mut drained = 0usize;
        while let Some(job) = job_rx.recv().await {
            drained += 1;
            self.dispatch(job).await;
        }
        if drained > 0 {
            debug!(subsystem = "jobs", component = "worker", drained, "Dispatched queued jobs during shutdown");
        }
        while let Some(result) = self.tasks.join_next().await {
            log_join_result(result);
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!(subsystem = "jobs", component = "worker", "Summary worker stopped");
    }

    async fn dispatch(&mut self, job: SummarizeJob) {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(subsystem = "jobs", component = "worker", job_id = %job.job_id, "Worker semaphore closed; dropping job");
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return;
            }
        };
        let handler = self.handler.clone();
        let event_tx = self.event_tx.clone();
        let in_flight = InFlightGuard(self.in_flight.clone());

        self.tasks.spawn(async move {
            let _permit = permit;
            let _in_flight = in_flight;
            execute_job(handler, event_tx, job).await;
        });
    }
}

async fn execute_job(
    handler: Arc<dyn JobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job: SummarizeJob,
) {
    let start = Instant::now();
    let job_id = job.job_id;
    let pdf_id = job.pdf_id;

    debug!(subsystem = "jobs", component = "worker", %job_id, %pdf_id, mode = job.mode.as_str(), "Processing job");
    let _ = event_tx.send(WorkerEvent::JobStarted { job_id, pdf_id });

    match handler.execute(job).await {
        JobResult::Success(_) => {
            info!(
                subsystem = "jobs",
                component = "worker",
                %job_id,
                %pdf_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job completed successfully"
            );
            let _ = event_tx.send(WorkerEvent::JobCompleted { job_id, pdf_id });
        }
        JobResult::Failed(error) => {
            warn!(
                subsystem = "jobs",
                component = "worker",
                %job_id,
                %pdf_id,
                %error,
                duration_ms = start.elapsed().as_millis() as u64,
                "Job failed"
            );
            let _ = event_tx.send(WorkerEvent::JobFailed {
                job_id,
                pdf_id,
                error,
            });
        }
    }
}

fn log_join_result(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(subsystem = "jobs", component = "worker", error = ?e, "Job task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pdfbrief_core::{SummaryMode, SummaryOutcome};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Handler that sleeps, then succeeds unless the pdf id is in `fail_for`.
    struct TestHandler {
        delay: Duration,
        fail_for: Option<Uuid>,
        panic_for: Option<Uuid>,
        running: AtomicUsize,
        max_running: AtomicUsize,
        executed: AtomicUsize,
    }

    impl TestHandler {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                fail_for: None,
                panic_for: None,
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
                executed: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobHandler for TestHandler {
        async fn execute(&self, job: SummarizeJob) -> JobResult {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.executed.fetch_add(1, Ordering::SeqCst);

            if Some(job.pdf_id) == self.panic_for {
                panic!("handler panic");
            }
            if Some(job.pdf_id) == self.fail_for {
                return JobResult::Failed("boom".to_string());
            }
            JobResult::Success(SummaryOutcome {
                summary_text: "ok".to_string(),
                process_time_ms: 1,
            })
        }
    }

    fn job() -> SummarizeJob {
        SummarizeJob::new(Uuid::now_v7(), "pdfs/x.pdf", SummaryMode::Detailed)
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.queue_capacity, 256);
    }

    #[test]
    fn test_worker_config_builder_clamps_zero() {
        let config = WorkerConfig::default()
            .with_max_concurrent(0)
            .with_queue_capacity(0);
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_worker_config_from_app_config() {
        let app = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/x".to_string()),
            "JOB_MAX_CONCURRENT" => Some("2".to_string()),
            "JOB_QUEUE_CAPACITY" => Some("8".to_string()),
            _ => None,
        })
        .unwrap();
        let config = WorkerConfig::from_app_config(&app);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.queue_capacity, 8);
    }

    #[tokio::test]
    async fn test_jobs_complete_and_emit_events() {
        let handler = Arc::new(TestHandler::new(5));
        let handle = SummaryWorker::new(handler.clone(), WorkerConfig::default()).start();
        let mut events = handle.events();

        let j = job();
        handle.submit(j.clone()).unwrap();

        let mut saw_started = false;
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap();
            match event {
                WorkerEvent::JobStarted { job_id, .. } if job_id == j.job_id => saw_started = true,
                WorkerEvent::JobCompleted { job_id, pdf_id } if job_id == j.job_id => {
                    assert_eq!(pdf_id, j.pdf_id);
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_started);
        handle.shutdown().await.unwrap();
        assert_eq!(handler.executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_job_emits_failure_event() {
        let j = job();
        let mut handler = TestHandler::new(0);
        handler.fail_for = Some(j.pdf_id);
        let handle = SummaryWorker::new(Arc::new(handler), WorkerConfig::default()).start();
        let mut events = handle.events();

        handle.submit(j.clone()).unwrap();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap();
            if let WorkerEvent::JobFailed { job_id, error, .. } = event {
                assert_eq!(job_id, j.job_id);
                assert_eq!(error, "boom");
                break;
            }
        }
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let handler = Arc::new(TestHandler::new(20));
        let handle = SummaryWorker::new(
            handler.clone(),
            WorkerConfig::default().with_max_concurrent(2),
        )
        .start();

        for _ in 0..6 {
            handle.submit(job()).unwrap();
        }
        handle.shutdown().await.unwrap();

        assert_eq!(handler.executed.load(Ordering::SeqCst), 6);
        assert!(handler.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_submission() {
        let handler = Arc::new(TestHandler::new(200));
        let handle = SummaryWorker::new(
            handler,
            WorkerConfig::default()
                .with_max_concurrent(1)
                .with_queue_capacity(1),
        )
        .start();

        let mut rejected = 0;
        for _ in 0..10 {
            if let Err(e) = handle.submit(job()) {
                assert!(matches!(e, Error::Job(_)));
                rejected += 1;
            }
        }
        assert!(rejected > 0);
        assert!(handle.in_flight() <= 10 - rejected);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let handler = Arc::new(TestHandler::new(10));
        let handle = SummaryWorker::new(
            handler.clone(),
            WorkerConfig::default().with_max_concurrent(1),
        )
        .start();
        let submitter = handle.submitter();

        for _ in 0..5 {
            submitter.submit(job()).unwrap();
        }
        handle.shutdown().await.unwrap();

        assert_eq!(handler.executed.load(Ordering::SeqCst), 5);
        assert_eq!(submitter.in_flight(), 0);
        assert!(submitter.submit(job()).is_err());
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_worker() {
        let bad = job();
        let mut handler = TestHandler::new(0);
        handler.panic_for = Some(bad.pdf_id);
        let handler = Arc::new(handler);
        let handle = SummaryWorker::new(handler.clone(), WorkerConfig::default()).start();

        handle.submit(bad).unwrap();
        handle.submit(job()).unwrap();
        handle.shutdown().await.unwrap();

        assert_eq!(handler.executed.load(Ordering::SeqCst), 2);
    }
}
