//! Language model boundary
//!
//! The pipeline only needs "prompt plus optional images in, text out". The
//! [`LanguageModel`] trait is that seam; [`OpenAiChatModel`] implements it
//! against any OpenAI-compatible `chat/completions` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::ModelConfig;

/// Image attached to a model request as a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePart {
    /// Short label used in logs ("user:hero.png", "website:https://...")
    pub label: String,
    pub data_url: String,
}

/// One multi-modal completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub prompt: String,
    pub images: Vec<ImagePart>,
    pub max_tokens: u64,
    pub temperature: f64,
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Empty response from model")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

/// OpenAI-compatible chat completion client
pub struct OpenAiChatModel {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            api_key: api_key.into(),
        })
    }

    /// Build from config with the key taken from `OPENAI_API_KEY`
    pub fn from_env(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::MissingApiKey("OPENAI_API_KEY".into()))?;
        Self::new(config, api_key)
    }

    /// Chat payload: plain text content without images, content parts with them
    fn request_body(&self, request: &ModelRequest) -> serde_json::Value {
        let content = if request.images.is_empty() {
            json!(request.prompt)
        } else {
            let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
            parts.extend(request.images.iter().map(|image| {
                json!({
                    "type": "image_url",
                    "image_url": { "url": image.data_url, "detail": "high" }
                })
            }));
            json!(parts)
        };

        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        debug!(
            model = %self.model,
            images = request.images.len(),
            prompt_chars = request.prompt.len(),
            "Sending completion request"
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(endpoint: &str) -> OpenAiChatModel {
        let config = ModelConfig {
            endpoint: endpoint.to_string(),
            ..ModelConfig::default()
        };
        OpenAiChatModel::new(&config, "test-key").unwrap()
    }

    fn request(images: Vec<ImagePart>) -> ModelRequest {
        ModelRequest {
            prompt: "Score this".into(),
            images,
            max_tokens: 1500,
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn sends_images_as_content_parts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4.1-mini",
                "max_tokens": 1500,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Score this" },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA", "detail": "high" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"score\": 80}" } }]
            })))
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server.uri())
            .complete(&request(vec![ImagePart {
                label: "user:a.png".into(),
                data_url: "data:image/png;base64,AAAA".into(),
            }]))
            .await
            .unwrap();

        assert_eq!(reply, "{\"score\": 80}");
    }

    #[tokio::test]
    async fn text_only_prompt_is_plain_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [{ "role": "user", "content": "Score this" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "ok" } }]
            })))
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server.uri()).complete(&request(vec![])).await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": null } }]
            })))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri()).complete(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server.uri()).complete(&request(vec![])).await.unwrap_err();
        match err {
            ModelError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
