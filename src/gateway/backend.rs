use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::{ChatMessage, SamplingConfig};
use crate::config::GATEWAY_TIMEOUT_SECS;
use crate::error::InterviewError;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingConfig,
}

/// Black-box text generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the first choice's content; empty when the model produced none.
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, InterviewError>;
}

/// OpenAI-compatible chat completions API (Groq by default).
pub struct GroqBackend {
    client: reqwest::Client,
    url: String,
}

impl GroqBackend {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.sampling.temperature,
            "max_tokens": request.sampling.max_tokens,
        });
        if request.sampling.json_object {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl CompletionBackend for GroqBackend {
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, InterviewError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| InterviewError::Gateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!("Completion API returned {}", status);
            return Err(InterviewError::Gateway(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InterviewError::Gateway(format!("Failed to parse JSON: {}", e)))?;

        Ok(json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}
