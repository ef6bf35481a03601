//! Control channel
//!
//! `POST /webhook` flips the RAG gate or runs a test query. Without a
//! `connection_id` the command applies to every tracked connection.
//!
//! ```json
//! {"command": "enable-rag"}
//! {"command": "disable-rag", "connection_id": "5f0c..."}
//! {"command": "test-query", "query": "When does the office open?"}
//! ```

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::connections::ControlCommand;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Body of a control request.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(flatten)]
    pub command: ControlCommand,
    /// Restrict the command to one connection
    #[serde(default)]
    pub connection_id: Option<Uuid>,
}

/// Acknowledgement of a control request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: String,
    pub command: String,
    /// Connections that acted on the command
    pub connections: usize,
}

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> AppResult<Json<WebhookResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let ControlCommand::TestQuery { query } = &request.command
        && query.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "test-query requires a non-empty query".to_string(),
        ));
    }

    if let Some(id) = request.connection_id
        && state.connections.get(&id).is_none()
    {
        return Err(AppError::NotFound(format!("connection {id}")));
    }

    let applied = state
        .connections
        .apply(&request.command, request.connection_id, &state.orchestrator);

    Ok(Json(WebhookResponse {
        status: "ok".to_string(),
        command: request.command.name().to_string(),
        connections: applied,
    }))
}
