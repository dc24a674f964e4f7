use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::error::InterviewError;
use crate::gateway::{GatewayReply, GatewayRequest, InterviewGateway};
use crate::state::SharedState;

/// ANY /api/interview: stateless persona endpoint.
pub async fn interview(
    State(state): State<SharedState>,
    method: Method,
    body: Bytes,
) -> Result<Response, InterviewError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(InterviewError::MethodNotAllowed);
    }

    state.endpoint.ensure_configured()?;

    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| InterviewError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;
    if !value.get("messages").is_some_and(|m| m.is_array()) {
        warn!("Rejected /api/interview call without a messages array");
        return Err(InterviewError::InvalidRequest(
            "Invalid messages format".to_string(),
        ));
    }
    let request: GatewayRequest = serde_json::from_value(value)
        .map_err(|_| InterviewError::InvalidRequest("Invalid messages format".to_string()))?;

    let reply = state.endpoint.reply(request).await?;
    Ok(Json(GatewayReply { reply }).into_response())
}
