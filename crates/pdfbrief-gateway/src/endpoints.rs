//! Derivation of the service endpoints from a single configured URL.

/// Resolved URLs for every summarizer operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizerEndpoints {
    pub summarize: String,
    pub preview: String,
    pub render_pdf: String,
    pub health: String,
}

impl SummarizerEndpoints {
    /// Build endpoints from either the service base URL
    /// (`http://host:8000`) or its summarize URL (`http://host:8000/summarize`).
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim().trim_end_matches('/');
        let base = trimmed.strip_suffix("/summarize").unwrap_or(trimmed);
        Self {
            summarize: format!("{}/summarize", base),
            preview: format!("{}/preview-pdf", base),
            render_pdf: format!("{}/download-summary-pdf", base),
            health: format!("{}/docs", base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_summarize_url() {
        let ep = SummarizerEndpoints::from_url("http://localhost:8000/summarize");
        assert_eq!(ep.summarize, "http://localhost:8000/summarize");
        assert_eq!(ep.preview, "http://localhost:8000/preview-pdf");
        assert_eq!(ep.render_pdf, "http://localhost:8000/download-summary-pdf");
        assert_eq!(ep.health, "http://localhost:8000/docs");
    }

    #[test]
    fn test_from_base_url_with_trailing_slash() {
        let ep = SummarizerEndpoints::from_url("http://summarizer:8000/");
        assert_eq!(ep.summarize, "http://summarizer:8000/summarize");
        assert_eq!(ep.preview, "http://summarizer:8000/preview-pdf");
    }

    #[test]
    fn test_prefix_path_is_kept() {
        let ep = SummarizerEndpoints::from_url("https://api.example.com/pdf/summarize");
        assert_eq!(ep.render_pdf, "https://api.example.com/pdf/download-summary-pdf");
    }
}
