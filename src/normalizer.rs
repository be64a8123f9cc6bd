//! Turns the raw model reply into an `AnalysisResult`
//!
//! The reply is cleaned in fixed steps: strip code fences, cut the outermost
//! `{...}` span, parse and check the required fields. Any failure along the
//! way yields the fixed fallback result instead of an error.

use serde_json::Value;
use tracing::warn;

use crate::analysis::{AnalysisResult, ObservationKind, ScreenshotResult, VisualObservation};

const FALLBACK_STRENGTH: &str = "could not analyze";
const FALLBACK_WEAKNESS: &str = "analysis failed";
const FALLBACK_SUGGESTION: &str = "try again in a few minutes";
const INDETERMINATE: &str = "indeterminate";

const PLACEHOLDER_SECTION: &str = "general";
const PLACEHOLDER_OBSERVATION: &str =
    "A website screenshot was analyzed but no detailed visual observations were returned.";

/// Why a reply could not be turned into a result
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("empty reply")]
    Empty,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("missing or invalid field `{0}`")]
    InvalidField(&'static str),
}

/// Normalize a model reply. Never fails: unusable replies become the fallback.
pub fn normalize(reply: &str, screenshot: Option<&ScreenshotResult>) -> AnalysisResult {
    let result = match parse_reply(extract_json_object(&strip_code_fences(reply))) {
        Ok(result) => result,
        Err(e) => {
            warn!(reply_chars = reply.len(), "Unusable model reply, using fallback: {}", e);
            fallback()
        }
    };
    attach_website_image(result, screenshot)
}

/// Fixed result used whenever the model call or its reply is unusable
pub fn fallback() -> AnalysisResult {
    AnalysisResult {
        score: 0,
        strengths: vec![FALLBACK_STRENGTH.to_string()],
        weaknesses: vec![FALLBACK_WEAKNESS.to_string()],
        suggestions: vec![FALLBACK_SUGGESTION.to_string()],
        mental_triggers: Vec::new(),
        emotional_tone: INDETERMINATE.to_string(),
        target_audience: INDETERMINATE.to_string(),
        website_image_count: 0,
        screenshot: None,
        visual_observations: None,
    }
}

/// Stamp the website image count and screenshot onto a result.
///
/// With a screenshot, `visual_observations` is guaranteed non-empty.
pub fn attach_website_image(
    mut result: AnalysisResult,
    screenshot: Option<&ScreenshotResult>,
) -> AnalysisResult {
    match screenshot {
        Some(shot) => {
            result.website_image_count = 1;
            result.screenshot = Some(shot.data_url());
            if result.visual_observations.as_ref().is_none_or(Vec::is_empty) {
                result.visual_observations = Some(vec![VisualObservation {
                    section: PLACEHOLDER_SECTION.to_string(),
                    observation: PLACEHOLDER_OBSERVATION.to_string(),
                    kind: ObservationKind::Neutral,
                }]);
            }
        }
        None => {
            result.website_image_count = 0;
            result.screenshot = None;
        }
    }
    result
}

/// Remove markdown code fence markers (```` ```json ```` and ```` ``` ````).
pub fn strip_code_fences(reply: &str) -> String {
    reply
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Keep the span from the first `{` to the last `}`; the input unchanged if there is none.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Parse a cleaned reply. `score` must be numeric, `strengths` and
/// `suggestions` must be arrays; everything else is read leniently.
pub fn parse_reply(json: &str) -> Result<AnalysisResult, ReplyError> {
    if json.trim().is_empty() {
        return Err(ReplyError::Empty);
    }

    let value: Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(ReplyError::NotAnObject)?;

    let score = object
        .get("score")
        .and_then(Value::as_f64)
        .ok_or(ReplyError::InvalidField("score"))?;
    let strengths = object
        .get("strengths")
        .and_then(Value::as_array)
        .ok_or(ReplyError::InvalidField("strengths"))?;
    let suggestions = object
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or(ReplyError::InvalidField("suggestions"))?;

    Ok(AnalysisResult {
        score: clamp_score(score),
        strengths: string_items(strengths),
        weaknesses: string_list(object.get("weaknesses")),
        suggestions: string_items(suggestions),
        mental_triggers: string_list(object.get("mentalTriggers")),
        emotional_tone: text_field(object.get("emotionalTone")),
        target_audience: text_field(object.get("targetAudience")),
        website_image_count: 0,
        screenshot: None,
        visual_observations: object
            .get("visualObservations")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_observation).collect()),
    })
}

/// Round to the nearest integer and clamp into 0..=100. NaN scores 0.
pub fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

fn string_items(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| string_items(items))
        .unwrap_or_default()
}

fn text_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn parse_observation(item: &Value) -> Option<VisualObservation> {
    let observation = item.get("observation").and_then(Value::as_str)?.trim();
    if observation.is_empty() {
        return None;
    }
    Some(VisualObservation {
        section: text_field(item.get("section")),
        observation: observation.to_string(),
        kind: ObservationKind::from_label(item.get("type").and_then(Value::as_str).unwrap_or("")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_REPLY: &str = r#"{
        "score": 72,
        "strengths": ["clear offer"],
        "weaknesses": ["no testimonials"],
        "suggestions": ["add a deadline"],
        "mentalTriggers": ["scarcity"],
        "emotionalTone": "enthusiastic",
        "targetAudience": "busy parents"
    }"#;

    fn screenshot() -> ScreenshotResult {
        ScreenshotResult::captured("https://shop.test", "iVBORw0K".into())
    }

    #[test]
    fn parses_plain_json() {
        let result = normalize(GOOD_REPLY, None);
        assert_eq!(result.score, 72);
        assert_eq!(result.strengths, vec!["clear offer"]);
        assert_eq!(result.mental_triggers, vec!["scarcity"]);
        assert_eq!(result.target_audience, "busy parents");
        assert_eq!(result.website_image_count, 0);
        assert!(result.screenshot.is_none());
        assert!(result.visual_observations.is_none());
    }

    #[test]
    fn strips_fences_and_surrounding_prose() {
        let reply = format!("Here is my analysis:\n```json\n{GOOD_REPLY}\n```\nHope it helps!");
        assert_eq!(normalize(&reply, None).score, 72);
    }

    #[test]
    fn extract_json_object_keeps_outermost_span() {
        assert_eq!(extract_json_object("x {\"a\": {\"b\": 1}} y"), "{\"a\": {\"b\": 1}}");
        assert_eq!(extract_json_object("no braces"), "no braces");
        assert_eq!(extract_json_object("} backwards {"), "} backwards {");
    }

    #[test]
    fn score_is_rounded_and_clamped() {
        assert_eq!(clamp_score(150.0), 100);
        assert_eq!(clamp_score(-3.0), 0);
        assert_eq!(clamp_score(72.6), 73);
        assert_eq!(clamp_score(f64::NAN), 0);

        let reply = GOOD_REPLY.replace("\"score\": 72", "\"score\": 250");
        assert_eq!(normalize(&reply, None).score, 100);
    }

    #[test]
    fn malformed_replies_fall_back() {
        for reply in [
            "",
            "I cannot help with that.",
            "{\"score\": \"high\", \"strengths\": [], \"suggestions\": []}",
            "{\"score\": 80, \"strengths\": \"good\", \"suggestions\": []}",
            "{\"score\": 80, \"strengths\": []}",
            "{\"score\": 80, \"strengths\": [], \"suggestions\": [}",
        ] {
            let result = normalize(reply, None);
            assert_eq!(result, fallback(), "reply: {reply:?}");
        }
    }

    #[test]
    fn fallback_has_fixed_texts() {
        let result = fallback();
        assert_eq!(result.score, 0);
        assert_eq!(result.strengths, vec!["could not analyze"]);
        assert_eq!(result.weaknesses, vec!["analysis failed"]);
        assert_eq!(result.suggestions, vec!["try again in a few minutes"]);
        assert!(result.mental_triggers.is_empty());
        assert_eq!(result.emotional_tone, "indeterminate");
        assert_eq!(result.target_audience, "indeterminate");
    }

    #[test]
    fn fallback_is_stamped_with_website_image() {
        let result = normalize("not json", Some(&screenshot()));
        assert_eq!(result.score, 0);
        assert_eq!(result.website_image_count, 1);
        assert_eq!(result.screenshot.as_deref(), Some("data:image/png;base64,iVBORw0K"));
    }

    #[test]
    fn screenshot_without_observations_gets_placeholder() {
        let result = normalize(GOOD_REPLY, Some(&screenshot()));
        let observations = result.visual_observations.unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].kind, ObservationKind::Neutral);
    }

    #[test]
    fn observations_are_parsed_leniently() {
        let reply = r#"{
            "score": 60, "strengths": [], "suggestions": [],
            "visualObservations": [
                {"section": "hero", "observation": "CTA above the fold", "type": "POSITIVE"},
                {"section": "footer", "observation": "cluttered", "type": "bad"},
                {"section": "pricing"},
                "stray string"
            ]
        }"#;
        let observations = normalize(reply, Some(&screenshot()))
            .visual_observations
            .unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].kind, ObservationKind::Positive);
        assert_eq!(observations[1].kind, ObservationKind::Neutral);
    }
}
