#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use proctored_interview::config::*;
use proctored_interview::error::InterviewError;
use proctored_interview::gateway::{
    CompletionBackend, CompletionRequest, GatewayRequest, InterviewGateway, LocalGateway,
    SharedGateway,
};
use proctored_interview::server::build_router;
use proctored_interview::state::{AppState, SharedState};

pub const SAMPLE_REPORT: &str = r#"{"overallScore":7,"skillBreakdown":[{"name":"Algorithms","score":6,"feedback":"ok"}],"strengths":["clear communication"],"weaknesses":["depth"],"improvementPlan":"practice graphs"}"#;

pub fn test_config(data_dir: &Path, api_key: Option<&str>) -> InterviewConfig {
    InterviewConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        log_file: None,
        model: "test-model".to_string(),
        api_base: DEFAULT_API_BASE.to_string(),
        api_key: api_key.map(str::to_string),
        gateway_url: None,
        session_duration_secs: SESSION_DURATION_SECS,
        max_violations: MAX_VIOLATIONS,
    }
}

/// Completion backend that answers every call with the same content.
pub struct StubBackend {
    pub reply: String,
    pub seen: Mutex<Vec<CompletionRequest>>,
}

impl StubBackend {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn complete(
        &self,
        _api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, InterviewError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

/// Gateway replaying queued results, then a default follow-up question.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, InterviewError>>>,
    pub requests: Mutex<Vec<GatewayRequest>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<String, InterviewError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterviewGateway for ScriptedGateway {
    async fn reply(&self, request: GatewayRequest) -> Result<String, InterviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Tell me more.".to_string()))
    }
}

pub fn app_with(
    data_dir: &Path,
    api_key: Option<&str>,
    backend: Arc<StubBackend>,
    gateway: SharedGateway,
) -> (Router, SharedState) {
    let config = test_config(data_dir, api_key);
    let endpoint = Arc::new(LocalGateway::new(
        backend,
        config.model.clone(),
        config.api_key.clone(),
    ));
    let state = Arc::new(AppState::from_parts(config, endpoint, gateway));
    (build_router(state.clone()), state)
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
