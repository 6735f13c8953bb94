//! # pdfbrief-jobs
//!
//! Summary lifecycle for uploaded PDFs.
//!
//! This crate provides:
//! - The [`Orchestrator`], entry point for upload, regenerate, list, get,
//!   delete, preview and render
//! - A supervised background worker with bounded concurrency and a bounded
//!   queue, reporting progress over a broadcast channel
//! - Per-document locks so summarizations of one document never overlap
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pdfbrief_jobs::{Orchestrator, SummaryProcessor, SummaryWorker, UploadLimits, WorkerConfig};
//!
//! let processor = Arc::new(SummaryProcessor::new(repo, store, backend));
//! let worker = SummaryWorker::new(processor.clone(), WorkerConfig::from_app_config(&config)).start();
//! let orchestrator = Orchestrator::new(processor, worker.submitter(), UploadLimits::from_app_config(&config));
//!
//! // ... serve requests ...
//!
//! worker.shutdown().await?;
//! ```

pub mod handler;
pub mod lifecycle;
pub mod locks;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod processor;
pub mod worker;

// Re-export core types
pub use pdfbrief_core::*;

pub use handler::{JobHandler, JobResult, SummarizeJob};
pub use lifecycle::{Orchestrator, UploadLimits, UploadRequest};
pub use locks::{DocumentGuard, DocumentLocks};
pub use processor::SummaryProcessor;
pub use worker::{JobSubmitter, SummaryWorker, WorkerConfig, WorkerEvent, WorkerHandle};
