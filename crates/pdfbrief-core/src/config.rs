//! Immutable application configuration.
//!
//! Built once at startup from the environment and handed to every component
//! that needs it; nothing else in the workspace reads environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DATABASE_URL` | (required) | PostgreSQL connection string |
//! | `MAX_UPLOAD_MB` | `10` | Maximum accepted upload size |
//! | `SUMMARIZER_URL` | `http://localhost:8000/summarize` | Summarizer service endpoint |
//! | `STORAGE_DIR` | `storage` | Artifact store root directory |
//! | `HOST` | `0.0.0.0` | Listen host |
//! | `PORT` | `8080` | Listen port |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` | Comma-separated CORS origins |
//! | `JOB_MAX_CONCURRENT` | `4` | Concurrent summarization jobs |
//! | `JOB_QUEUE_CAPACITY` | `256` | Queued summarization jobs |

use std::path::PathBuf;

use crate::defaults;
use crate::error::{Error, Result};

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub max_upload_mb: u64,
    pub summarizer_url: String,
    pub storage_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub job_max_concurrent: usize,
    pub job_queue_capacity: usize,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;

        // Non-numeric or non-positive values fall back to the default.
        let max_upload_mb = lookup("MAX_UPLOAD_MB")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map(|v| v as u64)
            .unwrap_or(defaults::MAX_UPLOAD_MB);

        let summarizer_url = lookup("SUMMARIZER_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| defaults::SUMMARIZER_URL.to_string());

        let storage_dir = lookup("STORAGE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(defaults::STORAGE_DIR));

        let host = lookup("HOST").unwrap_or_else(|| defaults::SERVER_HOST.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid PORT '{}': {}", raw, e)))?,
            None => defaults::SERVER_PORT,
        };

        let allowed_origins = parse_origins(
            lookup("ALLOWED_ORIGINS")
                .as_deref()
                .unwrap_or(defaults::ALLOWED_ORIGINS),
        );

        let job_max_concurrent = lookup("JOB_MAX_CONCURRENT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let job_queue_capacity = lookup("JOB_QUEUE_CAPACITY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults::JOB_QUEUE_CAPACITY)
            .max(1);

        Ok(Self {
            database_url,
            max_upload_mb,
            summarizer_url,
            storage_dir,
            host,
            port,
            allowed_origins,
            job_max_concurrent,
            job_queue_capacity,
        })
    }

    /// Upload limit in bytes, saturating for absurdly large `MAX_UPLOAD_MB`.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// `host:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() {
        vec![defaults::ALLOWED_ORIGINS.to_string()]
    } else {
        origins
    }
}
