use axum::{Json, extract::State};
use std::sync::Arc;

use crate::core::connections::ConnectionSummary;
use crate::state::AppState;

/// List tracked `/realtime` connections with their RAG gate and turn phase.
pub async fn list_connections(State(state): State<Arc<AppState>>) -> Json<Vec<ConnectionSummary>> {
    Json(state.connections.summaries())
}
