//! Realtime relay route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /realtime` - WebSocket upgrade; the client then speaks the OpenAI
/// Realtime event protocol as if connected to the provider directly.
///
/// # Example
///
/// ```json
/// // Client sends
/// {"type": "input_audio_buffer.append", "audio": "<base64 pcm16>"}
///
/// // Server relays provider events
/// {"type": "response.audio.delta", "delta": "<base64 pcm16>", ...}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/realtime", get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
