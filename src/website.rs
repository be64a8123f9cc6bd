//! Per-request website aggregation
//!
//! Sites are processed one after another. The first successful screenshot is
//! kept for the whole request and later sites skip capture; text extraction
//! runs for every site regardless.

use std::sync::Arc;
use tracing::{debug, info};

use crate::analysis::{AggregatedWebsiteContent, WebsiteRequest};
use crate::capture::ScreenshotSource;
use crate::page_extractor::PageTextExtractor;

const SCREENSHOT_AVAILABLE: &str = "SCREENSHOT: available for this analysis";
const SCREENSHOT_UNAVAILABLE: &str = "SCREENSHOT: not available for this analysis";

pub struct WebsiteAggregator {
    screenshots: Arc<dyn ScreenshotSource>,
    extractor: PageTextExtractor,
}

impl WebsiteAggregator {
    pub fn new(screenshots: Arc<dyn ScreenshotSource>, extractor: PageTextExtractor) -> Self {
        Self {
            screenshots,
            extractor,
        }
    }

    /// Build the text digest and pick the screenshot for `websites`.
    pub async fn aggregate(&self, websites: &[WebsiteRequest]) -> AggregatedWebsiteContent {
        let mut content = AggregatedWebsiteContent::default();
        let capture_available = self.screenshots.is_available();

        for website in websites {
            let url = website.url.as_str();

            if content.screenshot.is_none() && capture_available {
                let shot = self.screenshots.capture(url).await;
                if shot.capture_succeeded {
                    info!(url = %url, "Screenshot retained for analysis");
                    content.screenshot = Some(shot);
                }
            } else {
                debug!(url = %url, capture_available, "Skipping screenshot capture");
            }

            let text = self.extractor.extract(website).await;
            content.text_digest.push_str(&text.to_digest());
            content.text_digest.push_str(if content.has_screenshot() {
                SCREENSHOT_AVAILABLE
            } else {
                SCREENSHOT_UNAVAILABLE
            });
            content.text_digest.push('\n');
        }

        info!(
            sites = websites.len(),
            screenshot = content.has_screenshot(),
            digest_chars = content.text_digest.len(),
            "Website content aggregated"
        );
        content
    }
}
