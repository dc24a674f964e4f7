use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::warn;

use super::{GatewayReply, GatewayRequest, InterviewGateway};
use crate::config::GATEWAY_TIMEOUT_SECS;
use crate::error::InterviewError;

/// Calls a remote `/api/interview` endpoint.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpGateway {
    pub fn new(endpoint: &str) -> Result<Self, InterviewError> {
        let endpoint = url::Url::parse(endpoint).map_err(|e| {
            InterviewError::Configuration(format!("Invalid gateway URL '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(InterviewError::Configuration(format!(
                "Unsupported gateway URL scheme: {}",
                endpoint.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .build()
            .map_err(|e| InterviewError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl InterviewGateway for HttpGateway {
    async fn reply(&self, request: GatewayRequest) -> Result<String, InterviewError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| InterviewError::Gateway(format!("Failed to reach gateway: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let err = error_from_response(status, &body);
            warn!("Gateway returned {}: {}", status, err);
            return Err(err);
        }

        let reply: GatewayReply = resp
            .json()
            .await
            .map_err(|e| InterviewError::Gateway(format!("Invalid gateway reply: {}", e)))?;
        Ok(reply.reply)
    }
}

const MISCONFIGURATION_PREFIX: &str = "Server Misconfiguration";

/// A remote deployment without credentials is as fatal as a local one.
fn error_from_response(status: StatusCode, body: &serde_json::Value) -> InterviewError {
    let message = body
        .get("error")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("API Error: {}", status));

    if status.is_server_error() && message.starts_with(MISCONFIGURATION_PREFIX) {
        let detail = message[MISCONFIGURATION_PREFIX.len()..]
            .trim_start_matches(':')
            .trim();
        return InterviewError::Configuration(detail.to_string());
    }
    InterviewError::Gateway(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(matches!(
            HttpGateway::new("not a url"),
            Err(InterviewError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(HttpGateway::new("ftp://example.com/api/interview").is_err());
    }

    #[test]
    fn test_accepts_http_endpoint() {
        let gw = HttpGateway::new("http://127.0.0.1:8787/api/interview").unwrap();
        assert_eq!(gw.endpoint(), "http://127.0.0.1:8787/api/interview");
    }

    #[test]
    fn test_remote_misconfiguration_is_fatal() {
        let body = serde_json::json!({"error": "Server Misconfiguration: GROQ_API_KEY is not set"});
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(err, InterviewError::Configuration(_)));
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Server Misconfiguration: GROQ_API_KEY is not set"
        );
    }

    #[test]
    fn test_other_remote_failures_are_recoverable() {
        let body = serde_json::json!({"error": "Upstream timed out"});
        let err = error_from_response(StatusCode::BAD_GATEWAY, &body);
        assert!(matches!(err, InterviewError::Gateway(ref m) if m == "Upstream timed out"));
        assert!(err.is_recoverable());

        let err = error_from_response(StatusCode::BAD_REQUEST, &serde_json::Value::Null);
        assert!(matches!(err, InterviewError::Gateway(ref m) if m.starts_with("API Error: 400")));
    }
}
