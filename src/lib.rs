//! Marketing copy analysis with website rendering and extraction
//!
//! Fetches and digests landing pages, renders them in headless Chrome via
//! chromiumoxide for a screenshot, and asks a multi-modal language model to
//! score the copy against a fixed rubric.

pub mod analysis;
pub mod analyzer;
mod browser;
pub mod browser_setup;
pub mod capture;
pub mod model;
pub mod normalizer;
pub mod page_extractor;
pub mod prompt;
mod utils;
pub mod validation;
pub mod website;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub use utils::constants;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Language model endpoint and sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

/// Browser launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Master switch for screenshot capture
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default)]
    pub disable_security: bool,

    /// Allow downloading a managed Chromium when no system browser exists
    #[serde(default = "default_allow_download")]
    pub allow_download: bool,

    /// Explicit executable, takes precedence over detection
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

/// Screenshot retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_body_excerpt_chars")]
    pub body_excerpt_chars: usize,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model_name() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u64 {
    1500
}
fn default_model_timeout_secs() -> u64 {
    120
}

fn default_enabled() -> bool {
    true
}

fn default_headless() -> bool {
    true
}

fn default_allow_download() -> bool {
    true
}

fn default_window_width() -> u32 {
    constants::VIEWPORT_WIDTH
}

fn default_window_height() -> u32 {
    constants::VIEWPORT_HEIGHT
}

fn default_max_attempts() -> u32 {
    constants::MAX_CAPTURE_ATTEMPTS
}
fn default_navigation_timeout_ms() -> u64 {
    constants::NAVIGATION_TIMEOUT_MS
}
fn default_retry_pause_ms() -> u64 {
    constants::RETRY_PAUSE_MS
}

fn default_request_timeout_secs() -> u64 {
    15
}
fn default_body_excerpt_chars() -> usize {
    constants::BODY_EXCERPT_CHARS
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            name: default_model_name(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            headless: default_headless(),
            disable_security: false,
            allow_download: default_allow_download(),
            chrome_path: None,
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            retry_pause_ms: default_retry_pause_ms(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            body_excerpt_chars: default_body_excerpt_chars(),
        }
    }
}

/// Load config from `config.yaml`
///
/// `COPY_CRITIC_CONFIG` overrides the path; otherwise the file is looked up in
/// the working directory. A missing file yields the defaults.
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = std::env::var("COPY_CRITIC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"));

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use analysis::{
    AggregatedWebsiteContent, AnalysisRequest, AnalysisResult, ExtractedText, ImageStats,
    ObservationKind, ScreenshotResult, UserImage, VisualObservation, WebsiteRequest,
};
pub use analyzer::{AnalysisOutcome, CopyAnalyzer};
pub use browser::{BrowserError, BrowserResult, BrowserWrapper};
pub use capture::{ScreenshotCapturer, ScreenshotSource};
pub use model::{ImagePart, LanguageModel, ModelError, ModelRequest, OpenAiChatModel};
pub use page_extractor::{PageTextExtractor, UrlPreview, preview_url};
pub use validation::ValidationError;
pub use website::WebsiteAggregator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "browser:\n  enabled: false\ncapture:\n  max_attempts: 2\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert!(!config.browser.enabled);
        assert!(config.browser.headless);
        assert_eq!(config.browser.window.width, 1366);
        assert_eq!(config.capture.max_attempts, 2);
        assert_eq!(config.capture.navigation_timeout_ms, 30_000);
        assert_eq!(config.model.max_tokens, 1500);
        assert_eq!(config.extractor.body_excerpt_chars, 4000);
    }

    #[test]
    fn empty_yaml_is_default() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.model.name, "gpt-4.1-mini");
        assert!((config.model.temperature - 0.3).abs() < f64::EPSILON);
    }
}
