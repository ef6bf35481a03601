use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, connections, webhook};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: health check, control channel and connection
/// listing.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/webhook", post(webhook::webhook_handler))
        .route("/connections", get(connections::list_connections))
        .layer(TraceLayer::new_for_http())
}
