use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub mod api;
pub mod realtime;

/// All relay routes bound to `state`, without the CORS and security header
/// layers `main` adds on top.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(realtime::create_realtime_router())
        .with_state(state)
}
