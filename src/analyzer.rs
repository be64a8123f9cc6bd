//! Analysis entry point: aggregate websites, compose, call the model, normalize

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisRequest, AnalysisResult, ImageStats};
use crate::capture::{ScreenshotCapturer, ScreenshotSource};
use crate::model::LanguageModel;
use crate::page_extractor::PageTextExtractor;
use crate::validation::{ValidationError, validate_request};
use crate::website::WebsiteAggregator;
use crate::{Config, ModelConfig, normalizer, prompt};

/// Result envelope returned for a validated request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub result: AnalysisResult,
    pub image_stats: ImageStats,
}

pub struct CopyAnalyzer {
    aggregator: WebsiteAggregator,
    model: Arc<dyn LanguageModel>,
    model_config: ModelConfig,
}

impl CopyAnalyzer {
    pub fn new(
        aggregator: WebsiteAggregator,
        model: Arc<dyn LanguageModel>,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            aggregator,
            model,
            model_config,
        }
    }

    /// Wire the Chrome capturer and HTTP extractor from configuration.
    pub fn from_config(config: &Config, model: Arc<dyn LanguageModel>) -> anyhow::Result<Self> {
        let screenshots: Arc<dyn ScreenshotSource> = Arc::new(ScreenshotCapturer::new(
            config.browser.clone(),
            &config.capture,
        ));
        let extractor = PageTextExtractor::new(&config.extractor)?;

        Ok(Self::new(
            WebsiteAggregator::new(screenshots, extractor),
            model,
            config.model.clone(),
        ))
    }

    /// Run the pipeline for an already validated request. Never fails: model
    /// errors and unusable replies produce the fallback result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let website = self.aggregator.aggregate(&request.website_requests).await;
        let model_request = prompt::compose(request, &website, &self.model_config);

        info!(
            copy = request.copy().is_some(),
            user_images = request.user_images.len(),
            websites = request.website_requests.len(),
            screenshot = website.has_screenshot(),
            "Requesting copy analysis"
        );

        match self.model.complete(&model_request).await {
            Ok(reply) => normalizer::normalize(&reply, website.screenshot.as_ref()),
            Err(e) => {
                warn!("Model call failed, using fallback: {}", e);
                normalizer::attach_website_image(normalizer::fallback(), website.screenshot.as_ref())
            }
        }
    }

    /// Validate, analyze and wrap the result with an id, timestamp and image counts.
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, ValidationError> {
        validate_request(&request)?;

        let result = self.analyze(&request).await;
        let image_stats = ImageStats::new(
            u32::try_from(request.user_images.len()).unwrap_or(u32::MAX),
            result.website_image_count,
        );

        let outcome = AnalysisOutcome {
            id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            result,
            image_stats,
        };
        info!(id = %outcome.id, score = outcome.result.score, "Analysis complete");
        Ok(outcome)
    }
}
