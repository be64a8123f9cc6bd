//! URL preview: checks a site answers and reads its title before analysis

use scraper::Html;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::fetch::{FetchOutcome, PageTextExtractor};
use super::html::extract_title;
use crate::ExtractorConfig;
use crate::utils::constants::PREVIEW_TITLE_CHARS;
use crate::utils::{collapse_whitespace, truncate_chars};

pub const TITLE_NOT_FOUND: &str = "title not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPreview {
    pub url: String,
    pub title: String,
    pub accessible: bool,
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Error accessing URL: {0}")]
    Status(u16),

    #[error("Could not access the URL: {0}")]
    Unreachable(String),
}

impl PageTextExtractor {
    /// Fetch `url` and report its title, limited to 100 characters.
    pub async fn preview(&self, url: &str) -> Result<UrlPreview, PreviewError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(PreviewError::MissingUrl);
        }
        url::Url::parse(url).map_err(|e| PreviewError::InvalidUrl(format!("{url}: {e}")))?;

        let html = match self.fetch_html(url).await {
            Ok(FetchOutcome::Html(html)) => html,
            Ok(FetchOutcome::Status(status)) => return Err(PreviewError::Status(status.as_u16())),
            Err(e) => return Err(PreviewError::Unreachable(format!("{:#}", e))),
        };

        let document = Html::parse_document(&html);
        let title = extract_title(&document)
            .map(|title| collapse_whitespace(&title))
            .unwrap_or_else(|| TITLE_NOT_FOUND.to_string());

        info!(url = %url, "URL preview succeeded");
        Ok(UrlPreview {
            url: url.to_string(),
            title: truncate_chars(&title, PREVIEW_TITLE_CHARS),
            accessible: true,
        })
    }
}

/// One-shot preview using a default-configured extractor.
pub async fn preview_url(url: &str) -> Result<UrlPreview, PreviewError> {
    let extractor = PageTextExtractor::new(&ExtractorConfig::default())
        .map_err(|e| PreviewError::Unreachable(format!("{:#}", e)))?;
    extractor.preview(url).await
}
