//! Realtime relay WebSocket handler
//!
//! One task per client runs the event loop for the connection pair: client
//! frames, provider events, the pending connect and the idle check are all
//! multiplexed with `select!`. Writes to the client go through a dedicated
//! sender task so a slow client never stalls the provider side.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::core::connections::ConnectionState;
use crate::core::interceptor::{ClientDecision, ProviderDecision};
use crate::core::realtime::{
    ClientCommand, OpenAIRealtime, OpenAIRealtimeHandle, RealtimeSink, ServerEvent, SessionEvent,
};
use crate::state::AppState;

use super::messages::ClientRoute;

/// Channel buffer between the event loop and the client sender task
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How often the idle check runs
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Client silence after which the pair is torn down
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period for the sender task to flush the close frame
const SENDER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Realtime WebSocket handler
///
/// Upgrades the HTTP connection and pairs the client with a fresh upstream
/// session.
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Realtime WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_realtime_socket(socket, state))
}

/// Run the connection pair until either side goes away.
async fn handle_realtime_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let conn = app_state
        .connections
        .register(app_state.config.rag_enabled_by_default);
    let connection_id = conn.id();
    info!(
        %connection_id,
        rag_enabled = conn.rag_enabled(),
        "Realtime client connected"
    );

    let (mut sender, mut receiver) = socket.split();
    let (client_tx, mut client_rx) = mpsc::channel::<ClientRoute>(CHANNEL_BUFFER_SIZE);

    let sender_task = tokio::spawn(async move {
        while let Some(route) = client_rx.recv().await {
            match route {
                ClientRoute::Relay(text) => {
                    if let Err(e) = sender.send(Message::Text(text.into())).await {
                        error!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                ClientRoute::Close => {
                    if let Err(e) = sender.send(Message::Close(None)).await {
                        debug!("Client socket already closed: {}", e);
                    }
                    break;
                }
            }
        }
    });

    let (session_tx, mut session_rx) = mpsc::channel::<SessionEvent>(CHANNEL_BUFFER_SIZE);
    let connect = OpenAIRealtime::connect(app_state.config.realtime_config(), session_tx);
    tokio::pin!(connect);
    let mut connecting = true;

    let mut session: Option<OpenAIRealtime> = None;
    let mut sink: Option<OpenAIRealtimeHandle> = None;
    let mut pending: VecDeque<String> = VecDeque::new();

    let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);
    idle_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        select! {
            result = &mut connect, if connecting => {
                connecting = false;
                match result {
                    Ok(realtime) => {
                        let handle = realtime.handle();
                        conn.attach_session(Arc::new(handle.clone()));
                        info!(
                            %connection_id,
                            model = %realtime.model(),
                            queued = pending.len(),
                            "Upstream session connected"
                        );
                        while let Some(text) = pending.pop_front() {
                            forward_client_text(&conn, &handle, text).await;
                        }
                        sink = Some(handle);
                        session = Some(realtime);
                    }
                    Err(e) => {
                        error!(%connection_id, "Failed to open upstream session: {}", e);
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                last_activity = Instant::now();

                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text = text.to_string();
                        match &sink {
                            Some(handle) => forward_client_text(&conn, handle, text).await,
                            None => {
                                debug!(%connection_id, "Session not ready, queueing client message");
                                pending.push_back(text);
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        debug!(%connection_id, "Dropping binary client frame: {} bytes", data.len());
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!(%connection_id, "Realtime WebSocket close received");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(%connection_id, "Realtime WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(%connection_id, "Realtime WebSocket connection closed by client");
                        break;
                    }
                }
            }

            event = session_rx.recv() => {
                match event {
                    Some(SessionEvent::Message(text)) => {
                        if !handle_provider_frame(&conn, &app_state, &client_tx, text).await {
                            break;
                        }
                    }
                    Some(SessionEvent::Closed { reason }) => {
                        info!(%connection_id, %reason, "Upstream session closed");
                        break;
                    }
                    None => {
                        debug!(%connection_id, "Upstream session channel closed");
                        break;
                    }
                }
            }

            _ = idle_check.tick() => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        %connection_id,
                        "Realtime WebSocket connection idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    break;
                }
            }
        }
    }

    // Cleanup
    app_state.connections.remove(&connection_id);

    if let Some(mut realtime) = session {
        realtime.disconnect().await;
    }

    let _ = client_tx.send(ClientRoute::Close).await;
    drop(client_tx);
    let abort = sender_task.abort_handle();
    if tokio::time::timeout(SENDER_SHUTDOWN_TIMEOUT, sender_task)
        .await
        .is_err()
    {
        warn!(%connection_id, "Client sender task did not finish, aborting");
        abort.abort();
    }

    info!(%connection_id, "Realtime WebSocket connection terminated");
}

/// Forward one client frame upstream, unless the interceptor holds it back.
async fn forward_client_text(conn: &ConnectionState, sink: &dyn RealtimeSink, text: String) {
    let command = match ClientCommand::parse(&text) {
        Ok(command) => command,
        Err(e) => {
            warn!(connection_id = %conn.id(), "Dropping malformed client message: {}", e);
            return;
        }
    };

    match conn.on_client_event(&command) {
        ClientDecision::Forward => {
            if let Err(e) = sink.send_raw(text).await {
                warn!(
                    connection_id = %conn.id(),
                    event_type = command.event_type(),
                    "Failed to forward client event: {}",
                    e
                );
            }
        }
        ClientDecision::Drop => {
            debug!(
                connection_id = %conn.id(),
                event_type = command.event_type(),
                "Dropping client event during RAG turn"
            );
        }
    }
}

/// Route one provider frame. Returns `false` once the client side is gone.
async fn handle_provider_frame(
    conn: &Arc<ConnectionState>,
    app_state: &Arc<AppState>,
    client_tx: &mpsc::Sender<ClientRoute>,
    text: String,
) -> bool {
    let event = match ServerEvent::parse(&text) {
        Ok(event) => event,
        Err(e) => {
            debug!(connection_id = %conn.id(), "Relaying undecodable provider frame: {}", e);
            return client_tx.send(ClientRoute::Relay(text)).await.is_ok();
        }
    };

    if let ServerEvent::Error { error } = &event {
        warn!(
            connection_id = %conn.id(),
            error_type = %error.error_type,
            code = ?error.code,
            "Provider error: {}",
            error.message
        );
    }

    match conn.on_provider_event(&event) {
        ProviderDecision::Relay => client_tx.send(ClientRoute::Relay(text)).await.is_ok(),
        ProviderDecision::Suppress => {
            debug!(
                connection_id = %conn.id(),
                event_type = event.event_type(),
                "Suppressed provider event"
            );
            true
        }
        ProviderDecision::Trigger { turn, transcript } => {
            conn.dispatch_rag(app_state.orchestrator.clone(), turn, transcript);
            true
        }
    }
}
