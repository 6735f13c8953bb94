//! # pdfbrief-core
//!
//! Core types, traits, and abstractions for pdfbrief.
//!
//! This crate provides the document and summary data model, the error type,
//! the traits implemented by the storage and gateway crates, and the
//! immutable application configuration.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use config::AppConfig;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
