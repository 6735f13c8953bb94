//! # pdfbrief-gateway
//!
//! Client for the remote summarization service.
//!
//! The service exposes three operations next to each other:
//!
//! | Endpoint | Request | Response |
//! |----------|---------|----------|
//! | `POST /summarize` | JSON `{file_path, mode}` | JSON `{summary, process_time_ms}` |
//! | `POST /preview-pdf` | multipart field `file` | JSON `{preview_text}` |
//! | `POST /download-summary-pdf` | JSON `{summary}` | raw PDF bytes |
//!
//! Each call is made exactly once with a fixed timeout. Failures of any kind
//! surface as [`pdfbrief_core::Error::Gateway`].

pub mod client;
pub mod endpoints;

pub use client::SummarizerClient;
pub use endpoints::SummarizerEndpoints;
