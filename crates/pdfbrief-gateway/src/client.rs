//! reqwest-based [`SummarizationBackend`] implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pdfbrief_core::defaults::{GATEWAY_HEALTH_TIMEOUT_SECS, GATEWAY_TIMEOUT_SECS};
use pdfbrief_core::{AppConfig, Error, Result, SummarizationBackend, SummaryMode, SummaryOutcome};

use crate::endpoints::SummarizerEndpoints;

/// Client for the remote summarizer service.
#[derive(Debug, Clone)]
pub struct SummarizerClient {
    endpoints: SummarizerEndpoints,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    file_path: &'a str,
    mode: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
    #[serde(default)]
    process_time_ms: i64,
}

#[derive(Deserialize)]
struct PreviewResponse {
    #[serde(default)]
    preview_text: String,
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    summary: &'a str,
}

impl SummarizerClient {
    /// Create a client for the given service URL (base or `/summarize`).
    pub fn new(url: &str) -> Self {
        Self {
            endpoints: SummarizerEndpoints::from_url(url),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(GATEWAY_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.summarizer_url)
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &SummarizerEndpoints {
        &self.endpoints
    }

    /// Turn a non-2xx response into a gateway error carrying status and body.
    async fn ensure_success(
        service: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Gateway(format!(
            "{} returned {}: {}",
            service,
            status,
            body.trim()
        )))
    }
}

#[async_trait]
impl SummarizationBackend for SummarizerClient {
    async fn summarize(&self, absolute_path: &str, mode: SummaryMode) -> Result<SummaryOutcome> {
        let start = Instant::now();
        debug!(
            subsystem = "gateway",
            op = "summarize",
            mode = mode.as_str(),
            file_path = absolute_path,
            "Calling summarizer"
        );

        let response = self
            .client
            .post(&self.endpoints.summarize)
            .json(&SummarizeRequest {
                file_path: absolute_path,
                mode: mode.as_str(),
            })
            .timeout(self.timeout)
            .send()
            .await?;
        let response = Self::ensure_success("summarizer", response).await?;

        let body: SummarizeResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("invalid summarizer response: {}", e)))?;

        info!(
            subsystem = "gateway",
            op = "summarize",
            mode = mode.as_str(),
            remote_ms = body.process_time_ms,
            duration_ms = start.elapsed().as_millis() as u64,
            "Summarizer call completed"
        );

        Ok(SummaryOutcome {
            summary_text: body.summary,
            process_time_ms: i32::try_from(body.process_time_ms.max(0)).unwrap_or(i32::MAX),
        })
    }

    async fn preview(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(file_name.to_string())
            .mime_str(pdfbrief_core::defaults::PDF_MIME_TYPE)
            .map_err(|e| Error::Internal(format!("failed to build multipart body: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoints.preview)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;
        let response = Self::ensure_success("preview service", response).await?;

        let body: PreviewResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("invalid preview response: {}", e)))?;
        Ok(body.preview_text)
    }

    async fn render_pdf(&self, summary: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.endpoints.render_pdf)
            .json(&RenderRequest { summary })
            .timeout(self.timeout)
            .send()
            .await?;
        let response = Self::ensure_success("PDF generation service", response).await?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(&self.endpoints.health)
            .timeout(Duration::from_secs(GATEWAY_HEALTH_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                warn!(subsystem = "gateway", op = "health", error = %e, "Summarizer unreachable");
                Ok(false)
            }
        }
    }
}
