//! Test Fixtures Module
//!
//! Configuration fixtures and a harness that runs the relay on an ephemeral
//! port with a WebSocket client attached.

// Not every test binary uses every helper
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use waav_rag_relay::{ServerConfig, routes, state::AppState};

/// How long client reads wait before failing the test
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration pointing the relay at local mocks.
///
/// `search_base` is the base URL of the mock serving both search and
/// completions; `None` leaves the search backend unconfigured.
pub fn relay_config(realtime_url: &str, search_base: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        openai_api_key: Some("sk-test".to_string()),
        realtime_url: realtime_url.to_string(),
        realtime_model: "gpt-4o-realtime-preview".to_string(),
        realtime_transcription_model: None,
        realtime_connect_timeout_seconds: 5,
        completion_url: format!(
            "{}/v1/chat/completions",
            search_base.unwrap_or("http://127.0.0.1:9")
        ),
        completion_model: "gpt-4o-mini".to_string(),
        completion_api_key: None,
        search_endpoint: search_base.map(str::to_string),
        search_index: search_base.map(|_| "kb".to_string()),
        search_api_key: Some("search-key".to_string()),
        search_content_field: "content".to_string(),
        search_api_version: "2023-11-01".to_string(),
        rag_enabled_by_default: false,
        rag_max_documents: 2,
        rag_document_char_budget: 300,
        rag_max_output_tokens: 200,
        rag_temperature: 0.7,
        rag_injection_delay_ms: 20,
        rag_timeout_seconds: 5,
        cors_allowed_origins: None,
    }
}

/// Serve the relay routes on an ephemeral port.
pub async fn spawn_relay(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A browser-side client of `/realtime`.
pub struct RelayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{addr}/realtime")).await.unwrap();
        Self { ws }
    }

    pub async fn send(&mut self, event: Value) {
        self.ws
            .send(Message::Text(event.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    /// Next text frame, parsed. Fails the test on timeout or close.
    pub async fn next_event(&mut self) -> Value {
        match self.next_frame(CLIENT_TIMEOUT).await {
            Some(Message::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Next text frame within `wait`, if any.
    pub async fn event_within(&mut self, wait: Duration) -> Option<Value> {
        match self.next_frame(wait).await {
            Some(Message::Text(text)) => Some(serde_json::from_str(&text).unwrap()),
            _ => None,
        }
    }

    /// Wait until the relay closes the socket. Returns `false` on timeout.
    pub async fn wait_closed(&mut self) -> bool {
        let closed = async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                }
            }
        };
        tokio::time::timeout(CLIENT_TIMEOUT, closed).await.is_ok()
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    async fn next_frame(&mut self, wait: Duration) -> Option<Message> {
        loop {
            match tokio::time::timeout(wait, self.ws.next()).await {
                Ok(Some(Ok(Message::Ping(_)))) | Ok(Some(Ok(Message::Pong(_)))) => continue,
                Ok(Some(Ok(msg))) => return Some(msg),
                _ => return None,
            }
        }
    }
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
