use axum::routing::{any, get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::{health, history, interview, logs, sessions};
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health::health))
        // Stateless gateway
        .route("/api/interview", any(interview::interview))
        // Tracks and sessions
        .route("/tracks", get(sessions::list_tracks))
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::close_session),
        )
        .route("/sessions/{id}/start", post(sessions::start_session))
        .route("/sessions/{id}/answers", post(sessions::submit_answer))
        .route("/sessions/{id}/signals", post(sessions::record_signal))
        .route("/sessions/{id}/camera", post(sessions::report_camera))
        .route("/sessions/{id}/end", post(sessions::end_session))
        .route("/sessions/{id}/report", post(sessions::generate_report))
        .route("/sessions/{id}/stream", get(sessions::session_stream))
        // Attempt history
        .route("/history", get(history::list_history))
        // Logs
        .route("/logs/history", get(logs::log_history))
        .route("/logs/stream", get(logs::log_stream))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
