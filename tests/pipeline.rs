use async_trait::async_trait;
use copy_critic::{
    AnalysisRequest, CopyAnalyzer, ExtractorConfig, LanguageModel, ModelConfig, ModelError,
    ModelRequest, PageTextExtractor, ScreenshotResult, ScreenshotSource, UserImage,
    ValidationError, WebsiteAggregator, WebsiteRequest,
};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COPY: &str = "Limited offer: get 50% off our handcrafted coffee beans. Only 100 bags left, order today!";

/// Replies with a fixed script (or fails when there is none) and records every request.
struct ScriptedModel {
    reply: Option<String>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone().ok_or(ModelError::EmptyResponse)
    }
}

/// Screenshot source that succeeds for every URL and counts captures.
struct AlwaysCaptures {
    captures: Mutex<Vec<String>>,
}

impl AlwaysCaptures {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            captures: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ScreenshotSource for AlwaysCaptures {
    fn is_available(&self) -> bool {
        true
    }

    async fn capture(&self, url: &str) -> ScreenshotResult {
        self.captures.lock().unwrap().push(url.to_string());
        ScreenshotResult::captured(url, "iVBORw0KGgo".to_string())
    }
}

struct NoBrowser;

#[async_trait]
impl ScreenshotSource for NoBrowser {
    fn is_available(&self) -> bool {
        false
    }

    async fn capture(&self, url: &str) -> ScreenshotResult {
        ScreenshotResult::unavailable(url)
    }
}

fn analyzer(screenshots: Arc<dyn ScreenshotSource>, model: Arc<dyn LanguageModel>) -> CopyAnalyzer {
    let extractor = PageTextExtractor::new(&ExtractorConfig::default()).unwrap();
    CopyAnalyzer::new(
        WebsiteAggregator::new(screenshots, extractor),
        model,
        ModelConfig::default(),
    )
}

fn copy_request() -> AnalysisRequest {
    AnalysisRequest {
        copy_text: Some(COPY.to_string()),
        ..AnalysisRequest::default()
    }
}

/// A URL nothing listens on
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

async fn landing_page(server: &MockServer, route: &str) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Bean Club</title></head>
               <body><h1>Fresh coffee, every month</h1><button>Join now</button></body></html>"#,
        ))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

#[tokio::test]
async fn score_is_always_within_bounds() {
    for (reply, expected) in [
        (r#"{"score": 87, "strengths": [], "suggestions": []}"#, 87),
        (r#"{"score": 340, "strengths": [], "suggestions": []}"#, 100),
        (r#"{"score": -12.5, "strengths": [], "suggestions": []}"#, 0),
        ("garbage", 0),
    ] {
        let result = analyzer(Arc::new(NoBrowser), ScriptedModel::replying(reply))
            .analyze(&copy_request())
            .await;
        assert_eq!(result.score, expected, "reply: {reply}");
        assert!(result.score <= 100);
    }
}

#[tokio::test]
async fn unreachable_sites_leave_error_markers() {
    let model = ScriptedModel::replying(r#"{"score": 55, "strengths": ["x"], "suggestions": ["y"]}"#);
    let urls = [closed_port_url(), closed_port_url()];

    let request = AnalysisRequest {
        website_requests: urls.iter().map(WebsiteRequest::new).collect(),
        ..copy_request()
    };
    let result = analyzer(Arc::new(NoBrowser), model.clone()).analyze(&request).await;

    assert_eq!(result.score, 55);
    assert_eq!(result.website_image_count, 0);
    assert!(result.screenshot.is_none());

    let prompt = &model.requests()[0].prompt;
    assert_eq!(prompt.matches("ERROR accessing content").count(), 2);
    for url in &urls {
        assert!(prompt.contains(url.as_str()));
    }
}

#[tokio::test]
async fn only_first_screenshot_is_kept() {
    let server = MockServer::start().await;
    let first = landing_page(&server, "/one").await;
    let second = landing_page(&server, "/two").await;

    let screenshots = AlwaysCaptures::new();
    let model = ScriptedModel::replying(r#"{"score": 70, "strengths": [], "suggestions": []}"#);
    let request = AnalysisRequest {
        website_requests: vec![WebsiteRequest::new(&first), WebsiteRequest::new(&second)],
        ..copy_request()
    };

    let result = analyzer(screenshots.clone(), model.clone()).analyze(&request).await;

    assert_eq!(*screenshots.captures.lock().unwrap(), vec![first]);
    assert_eq!(result.website_image_count, 1);
    assert_eq!(result.screenshot.as_deref(), Some("data:image/png;base64,iVBORw0KGgo"));

    let sent = &model.requests()[0];
    assert_eq!(sent.images.len(), 1);
    assert!(sent.prompt.contains("visualObservations"));
    assert!(sent.prompt.contains("SITE: Bean Club"));
}

#[tokio::test]
async fn screenshot_always_comes_with_observations() {
    let server = MockServer::start().await;
    let url = landing_page(&server, "/").await;
    let request = AnalysisRequest {
        website_requests: vec![WebsiteRequest::new(&url)],
        ..copy_request()
    };

    // model ignored the instruction
    let omitted = analyzer(
        AlwaysCaptures::new(),
        ScriptedModel::replying(r#"{"score": 64, "strengths": [], "suggestions": []}"#),
    )
    .analyze(&request)
    .await;
    assert_eq!(omitted.visual_observations.map(|o| o.len()), Some(1));

    // model call failed entirely
    let failed = analyzer(AlwaysCaptures::new(), ScriptedModel::failing())
        .analyze(&request)
        .await;
    assert_eq!(failed.score, 0);
    assert_eq!(failed.website_image_count, 1);
    assert!(!failed.visual_observations.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn malformed_reply_yields_fallback() {
    let result = analyzer(
        Arc::new(NoBrowser),
        ScriptedModel::replying("```json\n{\"score\": \"great\"}\n```"),
    )
    .analyze(&copy_request())
    .await;

    assert_eq!(result.score, 0);
    assert_eq!(result.strengths, vec!["could not analyze"]);
    assert_eq!(result.weaknesses, vec!["analysis failed"]);
    assert_eq!(result.suggestions, vec!["try again in a few minutes"]);
    assert_eq!(result.emotional_tone, "indeterminate");
}

#[tokio::test]
async fn run_rejects_invalid_input_before_any_work() {
    let model = ScriptedModel::replying("{}");
    let analyzer = analyzer(Arc::new(NoBrowser), model.clone());

    let short = AnalysisRequest {
        copy_text: Some("x".repeat(49)),
        ..AnalysisRequest::default()
    };
    assert_eq!(
        analyzer.run(short).await.unwrap_err(),
        ValidationError::CopyTooShort(49)
    );
    assert_eq!(
        analyzer.run(AnalysisRequest::default()).await.unwrap_err(),
        ValidationError::EmptyRequest
    );
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn run_wraps_result_with_image_stats() {
    let server = MockServer::start().await;
    let url = landing_page(&server, "/").await;
    let model = ScriptedModel::replying(r#"{"score": 81, "strengths": ["a"], "suggestions": ["b"]}"#);

    let request = AnalysisRequest {
        copy_text: Some("x".repeat(50)),
        user_images: vec![UserImage {
            name: "ad.png".to_string(),
            data: "iVBORw0KGgo=".to_string(),
            mime_type: Some("image/png".to_string()),
        }],
        website_requests: vec![WebsiteRequest::new(&url)],
    };

    let outcome = analyzer(AlwaysCaptures::new(), model.clone())
        .run(request)
        .await
        .unwrap();

    assert_eq!(outcome.result.score, 81);
    assert_eq!(outcome.image_stats.user_images, 1);
    assert_eq!(outcome.image_stats.website_images, 1);
    assert_eq!(outcome.image_stats.total_images, 2);

    // user image first, screenshot last
    let images = &model.requests()[0].images;
    assert_eq!(images.len(), 2);
    assert!(images[0].data_url.starts_with("data:image/png;base64,iVBORw0KGgo="));
    assert_eq!(images[1].data_url, "data:image/png;base64,iVBORw0KGgo");

    let json = serde_json::to_value(&outcome).unwrap();
    assert!(json.get("analyzedAt").is_some());
    assert_eq!(json["imageStats"]["totalImages"], 2);
    assert_eq!(json["result"]["websiteImageCount"], 1);
}
