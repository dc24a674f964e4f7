pub mod backend;
pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{
    CHAT_MAX_TOKENS, CHAT_TEMPERATURE, DEFAULT_ROLE_CONTEXT, EMPTY_REPLY_FALLBACK,
    REPORT_MAX_TOKENS, REPORT_TEMPERATURE,
};
use crate::error::InterviewError;

pub use backend::{CompletionBackend, CompletionRequest, GroqBackend};
pub use http::HttpGateway;

pub const SYSTEM_PROMPT: &str = "You are a senior technical interviewer at a top product-based company.

Rules:
• Ask only one question at a time
• Never reveal answers during the interview
• Ask follow-ups if answers are shallow
• Increase difficulty if answers are strong
• Track strengths and mistakes silently
• End interview after 8–10 questions

At the end, generate a structured interview report with scores (0-10), strengths, and weaknesses.";

// --- Wire types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/interview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_mode: Option<bool>,
}

impl GatewayRequest {
    pub fn chat(messages: Vec<ChatMessage>, role: impl Into<String>) -> Self {
        Self {
            messages,
            role: Some(role.into()),
            json_mode: None,
        }
    }

    pub fn report(messages: Vec<ChatMessage>, role: impl Into<String>) -> Self {
        Self {
            messages,
            role: Some(role.into()),
            json_mode: Some(true),
        }
    }

    pub fn is_json_mode(&self) -> bool {
        self.json_mode.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReply {
    pub reply: String,
}

// --- Sampling ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_object: bool,
}

impl SamplingConfig {
    /// Fixed sampling keyed only by the report flag.
    pub fn for_mode(json_mode: bool) -> Self {
        if json_mode {
            Self {
                temperature: REPORT_TEMPERATURE,
                max_tokens: REPORT_MAX_TOKENS,
                json_object: true,
            }
        } else {
            Self {
                temperature: CHAT_TEMPERATURE,
                max_tokens: CHAT_MAX_TOKENS,
                json_object: false,
            }
        }
    }
}

/// Persona system turn followed by the client's messages in order.
pub fn build_conversation(role: Option<&str>, messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let role = role
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ROLE_CONTEXT);

    let mut conversation = Vec::with_capacity(messages.len() + 1);
    conversation.push(ChatMessage::system(format!(
        "{}\n\nCurrent Role: {}",
        SYSTEM_PROMPT, role
    )));
    conversation.extend(messages.iter().cloned());
    conversation
}

// --- Gateway seam ---

/// Request/response access to the interviewer model.
#[async_trait]
pub trait InterviewGateway: Send + Sync {
    async fn reply(&self, request: GatewayRequest) -> Result<String, InterviewError>;
}

pub type SharedGateway = Arc<dyn InterviewGateway>;

/// In-process gateway: synthesizes the persona turn and calls the backend.
pub struct LocalGateway {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    api_key: Option<String>,
}

impl LocalGateway {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Fails fast when no credentials are configured.
    pub fn ensure_configured(&self) -> Result<&str, InterviewError> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => {
                error!("Missing completion API key");
                Err(InterviewError::Configuration(
                    "Missing API Key".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl InterviewGateway for LocalGateway {
    async fn reply(&self, request: GatewayRequest) -> Result<String, InterviewError> {
        let api_key = self.ensure_configured()?;

        let json_mode = request.is_json_mode();
        let completion = CompletionRequest {
            model: self.model.clone(),
            messages: build_conversation(request.role.as_deref(), &request.messages),
            sampling: SamplingConfig::for_mode(json_mode),
        };

        info!(
            "Calling completion backend ({} messages, json_mode={})",
            completion.messages.len(),
            json_mode
        );
        let content = self.backend.complete(api_key, &completion).await?;
        debug!("Completion backend replied with {} chars", content.len());

        if content.trim().is_empty() {
            Ok(EMPTY_REPLY_FALLBACK.to_string())
        } else {
            Ok(content)
        }
    }
}
