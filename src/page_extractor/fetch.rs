use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::html::parse_document;
use crate::ExtractorConfig;
use crate::analysis::{ExtractedText, WebsiteRequest};
use crate::utils::constants::CHROME_USER_AGENT;

/// Result of a single GET
pub(crate) enum FetchOutcome {
    Html(String),
    Status(reqwest::StatusCode),
}

/// HTTP fetcher plus HTML digest builder for one analysis
#[derive(Clone)]
pub struct PageTextExtractor {
    http_client: reqwest::Client,
    body_excerpt_chars: usize,
}

impl PageTextExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(CHROME_USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            body_excerpt_chars: config.body_excerpt_chars,
        })
    }

    /// Fetch and digest one website. Never fails: a non-success status
    /// yields an inaccessible digest, any other failure an error note.
    pub async fn extract(&self, website: &WebsiteRequest) -> ExtractedText {
        let url = website.url.as_str();
        debug!(url = %url, "Extracting page text");

        match self.fetch_html(url).await {
            Ok(FetchOutcome::Html(html)) => {
                let text = parse_document(
                    url,
                    &html,
                    website.title_hint.as_deref(),
                    self.body_excerpt_chars,
                );
                info!(
                    url = %url,
                    headings = text.headings.len(),
                    ctas = text.cta_labels.len(),
                    "Extracted page text"
                );
                text
            }
            Ok(FetchOutcome::Status(status)) => {
                warn!(url = %url, status = %status, "Site answered with non-success status");
                ExtractedText::inaccessible(
                    url,
                    format!("Site inaccessible (HTTP {})", status.as_u16()),
                )
            }
            Err(e) => {
                warn!(url = %url, "Error extracting content: {:#}", e);
                ExtractedText::inaccessible(url, format!("error accessing site: {:#}", e))
            }
        }
    }

    pub(crate) async fn fetch_html(&self, url: &str) -> Result<FetchOutcome> {
        let response = self
            .http_client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchOutcome::Status(status));
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(FetchOutcome::Html(html))
    }
}
