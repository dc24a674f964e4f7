use axum::extract::State;
use axum::Json;

use crate::history::AttemptRecord;
use crate::state::SharedState;

/// GET /history: past attempts, most recent first.
pub async fn list_history(State(state): State<SharedState>) -> Json<Vec<AttemptRecord>> {
    Json(state.store.list())
}
