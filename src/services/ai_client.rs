//! HTTP client for OpenAI-compatible chat completion providers.
//!
//! Text prompts go to the text endpoint as a plain string message;
//! multimodal prompts go to the vision endpoint as `text` + `image_url`
//! content parts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::inference::{InferenceClient, ProviderError};
use crate::config::{InferenceSettings, ProviderEndpoint};
use crate::domain::ImageReference;

/// Client for the inference provider.
#[derive(Clone)]
pub struct HttpInferenceClient {
    client: Client,
    text: ProviderEndpoint,
    vision: ProviderEndpoint,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Error envelope returned by OpenAI-compatible providers.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl HttpInferenceClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(
            text_url = %settings.text.base_url,
            text_model = %settings.text.model,
            vision_url = %settings.vision.base_url,
            vision_model = %settings.vision.model,
            "Inference client initialized"
        );

        Ok(Self {
            client,
            text: trimmed(&settings.text),
            vision: trimmed(&settings.vision),
            timeout,
        })
    }

    async fn chat(
        &self,
        endpoint: &ProviderEndpoint,
        content: MessageContent<'_>,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", endpoint.base_url);
        let body = ChatRequest {
            model: &endpoint.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
        };

        debug!(url = %url, model = %endpoint.model, "Inference request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|env| env.error.message)
                .unwrap_or(raw);
            error!(status = %status, message = %message, "Inference provider error");
            return Err(classify_status(status, message));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to decode inference response");
            ProviderError::InvalidResponse(e.to_string())
        })?;

        extract_text(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        error!(error = %e, "Inference request failed");
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    #[instrument(skip_all, fields(prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.chat(&self.text, MessageContent::Text(prompt)).await
    }

    #[instrument(skip_all, fields(prompt_chars = prompt.len()))]
    async fn complete_multimodal(
        &self,
        prompt: &str,
        image: &ImageReference,
    ) -> Result<String, ProviderError> {
        self.chat(&self.vision, multimodal_content(prompt, image))
            .await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.text.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.text.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(classify_status(status, "health check failed".to_string()))
        }
    }
}

fn trimmed(endpoint: &ProviderEndpoint) -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        ..endpoint.clone()
    }
}

fn multimodal_content<'a>(prompt: &'a str, image: &'a ImageReference) -> MessageContent<'a> {
    MessageContent::Parts(vec![
        ContentPart::Text { text: prompt },
        ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.as_str(),
            },
        },
    ])
}

fn classify_status(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Unauthorized(status.as_u16())
        }
        s if s.is_client_error() => ProviderError::Rejected {
            status: s.as_u16(),
            message,
        },
        s => ProviderError::Upstream {
            status: s.as_u16(),
            message,
        },
    }
}

/// First choice's message text. A missing choice or null content is an
/// empty response; an empty string is passed through for the parser.
fn extract_text(response: ChatResponse) -> Result<String, ProviderError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or(ProviderError::EmptyResponse)
}
