//! OpenAI Realtime API session connection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Message, client::IntoClientRequest};

use super::config::{OPENAI_REALTIME_BETA_HEADER, OpenAIRealtimeModel};
use super::messages::{ClientEvent, InputAudioTranscription, SessionConfig};
use crate::core::realtime::base::{
    ConnectionStatus, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSink, SessionEvent,
};

/// Channel capacity for WebSocket message sending.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Frames queued for the provider socket.
#[derive(Debug)]
enum OutboundFrame {
    Event(ClientEvent),
    Raw(String),
}

// =============================================================================
// Session Handle
// =============================================================================

/// Cloneable write handle to a connected session.
#[derive(Clone)]
pub struct OpenAIRealtimeHandle {
    sender: mpsc::Sender<OutboundFrame>,
    connected: Arc<AtomicBool>,
}

impl OpenAIRealtimeHandle {
    async fn push(&self, frame: OutboundFrame) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.sender
            .send(frame)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }
}

#[async_trait]
impl RealtimeSink for OpenAIRealtimeHandle {
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        self.push(OutboundFrame::Event(event)).await
    }

    async fn send_raw(&self, text: String) -> RealtimeResult<()> {
        self.push(OutboundFrame::Raw(text)).await
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// =============================================================================
// OpenAI Realtime Client
// =============================================================================

/// One upstream session with the OpenAI Realtime API.
///
/// Inbound text frames are forwarded verbatim to the `events` channel given
/// to [`OpenAIRealtime::connect`]; the owner decides what to do with them.
/// There is no reconnection: a provider-side close is reported as
/// [`SessionEvent::Closed`] and ends the session.
pub struct OpenAIRealtime {
    config: RealtimeConfig,
    model: OpenAIRealtimeModel,
    state: Arc<RwLock<ConnectionStatus>>,
    handle: OpenAIRealtimeHandle,
    connection_handle: Option<JoinHandle<()>>,
}

impl OpenAIRealtime {
    /// Validate the configuration and open the session.
    ///
    /// Resolves once the WebSocket handshake has completed, or fails with
    /// [`RealtimeError::ConnectionFailed`] / [`RealtimeError::Timeout`].
    pub async fn connect(
        config: RealtimeConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = OpenAIRealtimeModel::from_str_or_default(&config.model);
        let state = Arc::new(RwLock::new(ConnectionStatus::Connecting));
        let url = build_ws_url(&config.url, &model);

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?,
        );
        headers.insert(
            "OpenAI-Beta",
            HeaderValue::from_static(OPENAI_REALTIME_BETA_HEADER),
        );

        let connect = tokio_tungstenite::connect_async(request);
        let (ws_stream, _response) = match tokio::time::timeout(config.connect_timeout, connect)
            .await
        {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                *state.write().await = ConnectionStatus::Failed;
                return Err(RealtimeError::ConnectionFailed(e.to_string()));
            }
            Err(_) => {
                *state.write().await = ConnectionStatus::Failed;
                return Err(RealtimeError::Timeout(format!(
                    "handshake with {} exceeded {:?}",
                    config.url, config.connect_timeout
                )));
            }
        };

        tracing::info!(model = %model, "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<OutboundFrame>(WS_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));
        *state.write().await = ConnectionStatus::Connected;

        let task_connected = connected.clone();
        let task_state = state.clone();
        let connection_handle = tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    Some(frame) = rx.recv() => {
                        let json = match frame {
                            OutboundFrame::Raw(text) => text,
                            OutboundFrame::Event(event) => match serde_json::to_string(&event) {
                                Ok(j) => j,
                                Err(e) => {
                                    tracing::error!("Failed to serialize event: {}", e);
                                    continue;
                                }
                            },
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break format!("send failed: {e}");
                        }
                    }

                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if events.send(SessionEvent::Message(text.to_string())).await.is_err() {
                                    break "session owner dropped".to_string();
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                tracing::info!("WebSocket closed by server");
                                break frame
                                    .map(|f| f.reason.to_string())
                                    .unwrap_or_else(|| "closed by provider".to_string());
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                break e.to_string();
                            }
                            None => break "stream ended".to_string(),
                        }
                    }
                }
            };

            task_connected.store(false, Ordering::SeqCst);
            *task_state.write().await = ConnectionStatus::Failed;
            let _ = events.send(SessionEvent::Closed { reason }).await;
            tracing::info!("OpenAI Realtime connection task ended");
        });

        let realtime = Self {
            config,
            model,
            state,
            handle: OpenAIRealtimeHandle {
                sender: tx,
                connected,
            },
            connection_handle: Some(connection_handle),
        };

        if let Some(session) = realtime.build_session_config() {
            realtime
                .handle
                .send_event(ClientEvent::SessionUpdate { session })
                .await?;
        }

        Ok(realtime)
    }

    /// Get the configured model.
    pub fn model(&self) -> &OpenAIRealtimeModel {
        &self.model
    }

    /// Current connection status.
    pub async fn status(&self) -> ConnectionStatus {
        *self.state.read().await
    }

    /// A cloneable write handle to this session.
    pub fn handle(&self) -> OpenAIRealtimeHandle {
        self.handle.clone()
    }

    /// Whether the session accepts frames.
    pub fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    /// Close the session. Safe to call more than once.
    pub async fn disconnect(&mut self) {
        self.handle.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.connection_handle.take() {
            handle.abort();
        }
        *self.state.write().await = ConnectionStatus::Disconnected;
        tracing::info!("Disconnected from OpenAI Realtime API");
    }

    /// The initial `session.update`, when the gateway is configured to turn
    /// on input transcription itself.
    fn build_session_config(&self) -> Option<SessionConfig> {
        self.config
            .transcription_model
            .as_ref()
            .map(|model| SessionConfig {
                input_audio_transcription: Some(InputAudioTranscription {
                    model: model.clone(),
                }),
            })
    }
}

impl Drop for OpenAIRealtime {
    fn drop(&mut self) {
        if let Some(handle) = self.connection_handle.take() {
            handle.abort();
        }
    }
}

/// Build the WebSocket URL with model parameter.
fn build_ws_url(base: &str, model: &OpenAIRealtimeModel) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}model={}", base, separator, model.as_str())
}
