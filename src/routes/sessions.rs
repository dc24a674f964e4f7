use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::error::InterviewError;
use crate::log_capture::{LogLevel, LogSource};
use crate::proctor::ProctorSignal;
use crate::report::Report;
use crate::session::SessionSnapshot;
use crate::state::SharedState;
use crate::track::Track;

#[derive(Serialize)]
pub struct TrackInfo {
    pub id: &'static str,
    pub label: &'static str,
}

/// GET /tracks
pub async fn list_tracks() -> Json<Vec<TrackInfo>> {
    Json(
        Track::ALL
            .iter()
            .map(|t| TrackInfo {
                id: t.id(),
                label: t.label(),
            })
            .collect(),
    )
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub role: String,
}

/// POST /sessions: open a session for the chosen track.
pub async fn create_session(
    State(state): State<SharedState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, InterviewError> {
    let track: Track = body.role.parse()?;
    let live = state.open_session(track).await;
    state
        .logs
        .emit_for(
            live.id(),
            LogSource::Session,
            LogLevel::Info,
            format!("Session created ({} track)", track),
        )
        .await;
    Ok((StatusCode::CREATED, Json(live.snapshot().await)))
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(live.snapshot().await))
}

/// POST /sessions/{id}/start: proctoring consent given.
pub async fn start_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(live.start().await?))
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub text: String,
}

/// POST /sessions/{id}/answers: submit an answer and wait for the next question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    let snapshot = live.submit_answer(state.gateway.as_ref(), &body.text).await?;
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
pub struct SignalRequest {
    pub kind: ProctorSignal,
    #[serde(default)]
    pub detail: Option<String>,
}

/// POST /sessions/{id}/signals: visibility/focus events from the client.
pub async fn record_signal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SignalRequest>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(
        live.record_signal(body.kind, body.detail.as_deref()).await,
    ))
}

#[derive(Deserialize)]
pub struct CameraRequest {
    pub granted: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// POST /sessions/{id}/camera: outcome of the client's capture request.
pub async fn report_camera(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CameraRequest>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(
        live.camera_report(body.granted, body.detail.as_deref())
            .await,
    ))
}

/// POST /sessions/{id}/end
pub async fn end_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(live.end().await?))
}

/// POST /sessions/{id}/report: generate once, then serve the cached report.
pub async fn generate_report(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, InterviewError> {
    let live = state.sessions.get(id).await?;
    Ok(Json(live.generate_report(&state.reports).await?))
}

/// DELETE /sessions/{id}: leave the session view.
pub async fn close_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, InterviewError> {
    state.sessions.remove(id).await?;
    state
        .logs
        .emit_for(id, LogSource::Session, LogLevel::Info, "Session closed")
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/{id}/stream: SSE stream of snapshots on every change.
pub async fn session_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, InterviewError> {
    let live = state.sessions.get(id).await?;
    let stream = WatchStream::new(live.subscribe()).map(|snapshot| {
        let data = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().event("snapshot").data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
