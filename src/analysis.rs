//! Request and result types for a single copy analysis
//!
//! Everything here is request-scoped: built at the start of one `analyze`
//! call and dropped at the end of it.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// A website the user wants included in the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteRequest {
    pub url: String,
    /// Title the caller already knows (e.g. from a URL preview)
    #[serde(default, alias = "title")]
    pub title_hint: Option<String>,
}

impl WebsiteRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title_hint: None,
        }
    }

    pub fn with_title_hint(mut self, title: impl Into<String>) -> Self {
        self.title_hint = Some(title.into());
        self
    }
}

/// An image uploaded alongside the copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserImage {
    pub name: String,
    /// Either a `data:` URL or bare base64
    #[serde(alias = "base64")]
    pub data: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl UserImage {
    /// Mime type from the explicit field, else from the data URL prefix.
    pub fn resolved_mime_type(&self) -> Option<String> {
        if let Some(mime) = &self.mime_type {
            return Some(mime.clone());
        }
        let rest = self.data.strip_prefix("data:")?;
        let (mime, _) = rest.split_once(';')?;
        Some(mime.to_string())
    }

    /// The base64 payload with any data URL header removed.
    pub fn base64_payload(&self) -> &str {
        match self.data.split_once(";base64,") {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => self.data.as_str(),
        }
    }

    /// Size of the decoded image in bytes, `None` if the payload is not valid base64.
    pub fn decoded_len(&self) -> Option<usize> {
        BASE64
            .decode(self.base64_payload().trim())
            .ok()
            .map(|bytes| bytes.len())
    }

    /// Data URL suitable for an `image_url` model part.
    pub fn data_url(&self) -> String {
        if self.data.starts_with("data:") {
            return self.data.clone();
        }
        let mime = self
            .resolved_mime_type()
            .unwrap_or_else(|| "image/png".to_string());
        format!("data:{};base64,{}", mime, self.data)
    }
}

/// Inbound analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub copy_text: Option<String>,
    #[serde(default, alias = "images")]
    pub user_images: Vec<UserImage>,
    #[serde(default, alias = "websites")]
    pub website_requests: Vec<WebsiteRequest>,
}

impl AnalysisRequest {
    /// Copy text if present and not blank
    pub fn copy(&self) -> Option<&str> {
        self.copy_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Structured digest of one page's HTML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub source_url: String,
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<String>,
    pub cta_labels: Vec<String>,
    pub form_labels: Vec<String>,
    pub price_snippets: Vec<String>,
    pub body_excerpt: String,
    /// False when the page could not be fetched or parsed
    pub accessible: bool,
}

impl ExtractedText {
    /// Digest for a page that answered with a non-success status or could not be reached.
    pub fn inaccessible(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: String::new(),
            meta_description: String::new(),
            headings: Vec::new(),
            cta_labels: Vec::new(),
            form_labels: Vec::new(),
            price_snippets: Vec::new(),
            body_excerpt: reason.into(),
            accessible: false,
        }
    }

    /// Labeled text block contributed to the aggregated website digest.
    pub fn to_digest(&self) -> String {
        if !self.accessible {
            return format!(
                "\n\nSITE: {} - ERROR accessing content: {}\n",
                self.source_url, self.body_excerpt
            );
        }

        let mut digest = format!("\n\nSITE: {} ({})\n", self.title, self.source_url);
        if !self.meta_description.is_empty() {
            digest.push_str(&format!("DESCRIPTION: {}\n", self.meta_description));
        }
        digest.push_str(&format!("HEADINGS: {}\n", self.headings.join(" | ")));
        if !self.cta_labels.is_empty() {
            digest.push_str(&format!("CALLS TO ACTION: {}\n", self.cta_labels.join(" | ")));
        }
        if !self.form_labels.is_empty() {
            digest.push_str(&format!("FORM FIELDS: {}\n", self.form_labels.join(" | ")));
        }
        if !self.price_snippets.is_empty() {
            digest.push_str(&format!("PRICES: {}\n", self.price_snippets.join(" | ")));
        }
        digest.push_str(&format!("CONTENT: {}\n", self.body_excerpt));
        digest
    }
}

/// Outcome of a screenshot capture for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotResult {
    pub source_url: String,
    /// Base64-encoded PNG, empty when the capture failed
    pub image_data: String,
    pub capture_succeeded: bool,
}

impl ScreenshotResult {
    pub fn captured(source_url: impl Into<String>, image_data: String) -> Self {
        Self {
            source_url: source_url.into(),
            image_data,
            capture_succeeded: true,
        }
    }

    pub fn unavailable(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            image_data: String::new(),
            capture_succeeded: false,
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.image_data)
    }
}

/// Text digest of every requested website plus the single retained screenshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedWebsiteContent {
    pub text_digest: String,
    pub screenshot: Option<ScreenshotResult>,
}

impl AggregatedWebsiteContent {
    pub fn has_screenshot(&self) -> bool {
        self.screenshot.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationKind {
    Positive,
    Negative,
    Neutral,
}

impl ObservationKind {
    /// Lenient parse; anything unrecognised is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

/// Model remark about one region of the website screenshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualObservation {
    pub section: String,
    pub observation: String,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
}

/// Normalized analysis returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub mental_triggers: Vec<String>,
    pub emotional_tone: String,
    pub target_audience: String,
    pub website_image_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_observations: Option<Vec<VisualObservation>>,
}

/// Image counters reported with every outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total_images: u32,
    pub user_images: u32,
    pub website_images: u32,
}

impl ImageStats {
    pub fn new(user_images: u32, website_images: u32) -> Self {
        Self {
            total_images: user_images.saturating_add(website_images),
            user_images,
            website_images,
        }
    }
}
