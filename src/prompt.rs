//! Builds the multi-modal model request for one analysis

use crate::ModelConfig;
use crate::analysis::{AggregatedWebsiteContent, AnalysisRequest};
use crate::model::{ImagePart, ModelRequest};

/// Minimum number of visual observations asked for when a screenshot is attached
pub const MIN_VISUAL_OBSERVATIONS: usize = 5;

const INTRO: &str = "Analyze the following digital marketing content as an expert copywriter \
and conversion specialist.";

const RUBRIC: &str = "\
EVALUATION CRITERIA (100 points total):
- Clarity of the value proposition (25 points)
- Urgency and scarcity (20 points)
- Social proof and credibility (20 points)
- Effective call-to-action (15 points)
- Emotional connection (10 points)
- Structure and fluency (10 points)";

const WEBSITE_INSTRUCTION: &str = "WEBSITE-SPECIFIC ANALYSIS: Compare the provided content with \
copywriting best practices for websites and identify missing elements that could improve \
conversion.";

const RESPONSE_FORMAT: &str = r#"IMPORTANT: Respond ONLY with a single valid JSON object. No markdown, no code fences, no extra commentary.

Expected format:
{
  "score": <number from 0 to 100>,
  "strengths": ["strength 1", "strength 2"],
  "weaknesses": ["weakness 1", "weakness 2"],
  "suggestions": ["specific suggestion 1", "specific suggestion 2"],
  "mentalTriggers": ["trigger 1", "trigger 2"],
  "emotionalTone": "description of the emotional tone",
  "targetAudience": "description of the ideal target audience""#;

const VISUAL_FORMAT: &str = r#",
  "visualObservations": [
    { "section": "page area, e.g. hero or pricing", "observation": "what you see and why it matters", "type": "positive | negative | neutral" }
  ]"#;

/// Compose the request from the user input and the aggregated website content.
pub fn compose(
    request: &AnalysisRequest,
    website: &AggregatedWebsiteContent,
    config: &ModelConfig,
) -> ModelRequest {
    let mut images: Vec<ImagePart> = request
        .user_images
        .iter()
        .map(|image| ImagePart {
            label: format!("user:{}", image.name),
            data_url: image.data_url(),
        })
        .collect();

    if let Some(screenshot) = &website.screenshot {
        images.push(ImagePart {
            label: format!("website:{}", screenshot.source_url),
            data_url: screenshot.data_url(),
        });
    }

    ModelRequest {
        prompt: build_prompt(request, website),
        images,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

fn build_prompt(request: &AnalysisRequest, website: &AggregatedWebsiteContent) -> String {
    let mut prompt = format!("{INTRO}\n\n");

    if let Some(copy) = request.copy() {
        prompt.push_str(&format!("COPY TO ANALYZE:\n\"{copy}\"\n\n"));
    }

    if !website.text_digest.trim().is_empty() {
        prompt.push_str(&format!("WEBSITE CONTENT:\n{}\n\n", website.text_digest));
    }

    let user_count = request.user_images.len();
    let screenshot_count = usize::from(website.has_screenshot());
    if user_count + screenshot_count > 0 {
        prompt.push_str(&format!(
            "ATTACHED IMAGES: {} in total ({} submitted by the user, {} website screenshot)\n",
            user_count + screenshot_count,
            user_count,
            screenshot_count
        ));
        if user_count > 0 {
            prompt.push_str(&format!(
                "- The first {user_count} image(s) are marketing materials submitted by the user.\n"
            ));
        }
        if screenshot_count > 0 {
            prompt.push_str(
                "- The last image is a full-page screenshot of the website. Evaluate its visual \
                 hierarchy, layout, call-to-action placement and how the design supports the copy.\n",
            );
        }
        prompt.push('\n');
    }

    prompt.push_str(RESPONSE_FORMAT);
    if screenshot_count > 0 {
        prompt.push_str(VISUAL_FORMAT);
    }
    prompt.push_str("\n}\n\n");

    if screenshot_count > 0 {
        prompt.push_str(&format!(
            "Because a website screenshot is attached, \"visualObservations\" is REQUIRED and \
             must contain at least {MIN_VISUAL_OBSERVATIONS} entries covering different areas \
             of the page.\n\n"
        ));
    }

    prompt.push_str(RUBRIC);

    if !request.website_requests.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(WEBSITE_INSTRUCTION);
    }

    prompt
}
