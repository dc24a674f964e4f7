use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub gateway: GatewayHealth,
    pub sessions: SessionsHealth,
    pub history_path: String,
    pub started_at: String,
}

#[derive(Serialize)]
pub struct GatewayHealth {
    pub model: String,
    pub credentials_configured: bool,
    pub remote_url: Option<String>,
}

#[derive(Serialize)]
pub struct SessionsHealth {
    pub live: usize,
    pub duration_secs: u64,
    pub max_violations: u32,
}

/// Pure status rule, kept separate for testing.
pub fn determine_overall_status(credentials_configured: bool, remote_gateway: bool) -> &'static str {
    if credentials_configured || remote_gateway {
        "healthy"
    } else {
        "degraded"
    }
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(build_health_response(&state).await)
}

pub async fn build_health_response(state: &SharedState) -> HealthResponse {
    let credentials_configured = state.config.has_credentials();
    let remote_url = state.config.gateway_url.clone();

    HealthResponse {
        status: determine_overall_status(credentials_configured, remote_url.is_some())
            .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway: GatewayHealth {
            model: state.endpoint.model().to_string(),
            credentials_configured,
            remote_url,
        },
        sessions: SessionsHealth {
            live: state.sessions.len().await,
            duration_secs: state.config.session_duration_secs,
            max_violations: state.config.max_violations,
        },
        history_path: state.store.path().display().to_string(),
        started_at: state.started_at.to_rfc3339(),
    }
}
