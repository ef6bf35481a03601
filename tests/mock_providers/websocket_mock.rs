//! Scripted OpenAI Realtime WebSocket server
//!
//! Accepts a single relay connection. Tests push provider events with
//! [`MockRealtimeServer::send`] and read what the relay forwarded with
//! [`MockRealtimeServer::next_received`].

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// How long `next_received` waits before failing the test
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

enum MockAction {
    Send(String),
    Close,
}

pub struct MockRealtimeServer {
    url: String,
    actions: mpsc::UnboundedSender<MockAction>,
    received: mpsc::UnboundedReceiver<String>,
    connections: Arc<AtomicU64>,
    authorization: Arc<Mutex<Option<String>>>,
    request_uri: Arc<Mutex<Option<String>>>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        Self::start_with_accept_delay(Duration::ZERO).await
    }

    /// Hold the WebSocket handshake for `delay` after the TCP accept, so the
    /// relay's session stays "connecting" for a while.
    pub async fn start_with_accept_delay(delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (actions_tx, mut actions_rx) = mpsc::unbounded_channel::<MockAction>();
        let (received_tx, received_rx) = mpsc::unbounded_channel::<String>();
        let connections = Arc::new(AtomicU64::new(0));
        let authorization = Arc::new(Mutex::new(None));
        let request_uri = Arc::new(Mutex::new(None));

        let task_connections = connections.clone();
        let task_authorization = authorization.clone();
        let task_request_uri = request_uri.clone();
        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            task_connections.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;

            let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                *task_authorization.lock() = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *task_request_uri.lock() = Some(req.uri().to_string());
                Ok(resp)
            };
            let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
                return;
            };
            let (mut write, mut read) = ws_stream.split();

            loop {
                tokio::select! {
                    action = actions_rx.recv() => match action {
                        Some(MockAction::Send(text)) => {
                            if write.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(MockAction::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(text.to_string());
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                }
            }
            task_connections.fetch_sub(1, Ordering::SeqCst);
        });

        Self {
            url: format!("ws://{addr}/v1/realtime"),
            actions: actions_tx,
            received: received_rx,
            connections,
            authorization,
            request_uri,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a provider event to the relay.
    pub fn send(&self, event: Value) {
        let _ = self.actions.send(MockAction::Send(event.to_string()));
    }

    /// Push a raw text frame to the relay.
    pub fn send_raw(&self, text: &str) {
        let _ = self.actions.send(MockAction::Send(text.to_string()));
    }

    /// Close the provider side of the session.
    pub fn close(&self) {
        let _ = self.actions.send(MockAction::Close);
    }

    /// Next frame the relay sent upstream, as raw text.
    pub async fn next_received_raw(&mut self) -> String {
        tokio::time::timeout(RECEIVE_TIMEOUT, self.received.recv())
            .await
            .expect("timed out waiting for a frame from the relay")
            .expect("mock realtime connection ended")
    }

    /// Next frame the relay sent upstream, parsed.
    pub async fn next_received(&mut self) -> Value {
        serde_json::from_str(&self.next_received_raw().await).unwrap()
    }

    /// Whatever arrives within `wait`, if anything.
    pub async fn received_within(&mut self, wait: Duration) -> Option<Value> {
        match tokio::time::timeout(wait, self.received.recv()).await {
            Ok(Some(text)) => Some(serde_json::from_str(&text).unwrap()),
            _ => None,
        }
    }

    /// Open connections right now.
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    /// `Authorization` header of the relay's handshake.
    pub fn authorization(&self) -> Option<String> {
        self.authorization.lock().clone()
    }

    /// Request URI of the relay's handshake.
    pub fn request_uri(&self) -> Option<String> {
        self.request_uri.lock().clone()
    }
}
