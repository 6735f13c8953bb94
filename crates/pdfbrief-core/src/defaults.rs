//! Centralized default constants for pdfbrief.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// UPLOADS
// =============================================================================

/// Default maximum upload size in megabytes (`MAX_UPLOAD_MB`).
pub const MAX_UPLOAD_MB: u64 = 10;

/// Only accepted upload extension (compared case-insensitively).
pub const PDF_EXTENSION: &str = "pdf";

/// MIME type recorded for every uploaded document.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Extra bytes allowed on top of the upload limit for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// =============================================================================
// STORAGE
// =============================================================================

/// Default artifact store root (`STORAGE_DIR`).
pub const STORAGE_DIR: &str = "storage";

/// Sub-directory of the store root holding uploaded PDFs.
pub const PDF_SUBDIR: &str = "pdfs";

// =============================================================================
// SUMMARIZER GATEWAY
// =============================================================================

/// Default summarizer endpoint (`SUMMARIZER_URL`).
pub const SUMMARIZER_URL: &str = "http://localhost:8000/summarize";

/// Timeout applied to every summarizer call.
pub const GATEWAY_TIMEOUT_SECS: u64 = 120;

/// Timeout for the summarizer health probe.
pub const GATEWAY_HEALTH_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP listen host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP listen port.
pub const SERVER_PORT: u16 = 8080;

/// Default CORS origin (the web frontend dev server).
pub const ALLOWED_ORIGINS: &str = "http://localhost:3000";

// =============================================================================
// JOBS
// =============================================================================

/// Maximum summarization jobs running at once.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Maximum queued summarization jobs before submissions are rejected.
pub const JOB_QUEUE_CAPACITY: usize = 256;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;
