//! Tracked client connections and the RAG control surface.
//!
//! Every live `/realtime` client owns one [`ConnectionState`]. The registry
//! is the only thing shared across connections, and the control channel only
//! ever touches a connection's RAG gate (and, when turning it off, its turn
//! state).

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::interceptor::{ClientDecision, ProviderDecision, TurnInterceptor, TurnPhase};
use crate::core::rag::{RagOrchestrator, RagOutcome};
use crate::core::realtime::{ClientCommand, RealtimeSink, ServerEvent};

// =============================================================================
// Control Commands
// =============================================================================

/// Commands accepted by the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ControlCommand {
    /// Turn on turn interception
    EnableRag,
    /// Turn off turn interception and abandon any in-flight turn
    DisableRag,
    /// Run retrieval for `query` and speak the result, as if the user had
    /// asked it
    TestQuery { query: String },
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::EnableRag => "enable-rag",
            ControlCommand::DisableRag => "disable-rag",
            ControlCommand::TestQuery { .. } => "test-query",
        }
    }
}

// =============================================================================
// Per-connection State
// =============================================================================

/// State owned by one client connection.
pub struct ConnectionState {
    id: Uuid,
    /// Turn state and the RAG gate, changed together under one lock
    turn: Mutex<TurnInterceptor>,
    cancel: CancellationToken,
    session: RwLock<Option<Arc<dyn RealtimeSink>>>,
}

impl ConnectionState {
    pub fn new(rag_enabled: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            turn: Mutex::new(TurnInterceptor::new(rag_enabled)),
            cancel: CancellationToken::new(),
            session: RwLock::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rag_enabled(&self) -> bool {
        self.turn.lock().rag_enabled()
    }

    /// Set the RAG gate. Turning it off also abandons the current turn.
    pub fn set_rag_enabled(&self, enabled: bool) {
        let abandoned = self.turn.lock().set_rag_enabled(enabled);
        if abandoned {
            tracing::info!(connection_id = %self.id, "RAG disabled mid-turn; turn state reset");
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.turn.lock().phase().clone()
    }

    /// Token cancelled when the connection is torn down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Attach the upstream session once it is connected.
    pub fn attach_session(&self, sink: Arc<dyn RealtimeSink>) {
        *self.session.write() = Some(sink);
    }

    pub fn session(&self) -> Option<Arc<dyn RealtimeSink>> {
        self.session.read().clone()
    }

    /// Classify a provider event under the current gate.
    pub fn on_provider_event(&self, event: &ServerEvent) -> ProviderDecision {
        self.turn.lock().on_provider_event(event)
    }

    /// Classify a client event.
    pub fn on_client_event(&self, command: &ClientCommand) -> ClientDecision {
        self.turn.lock().on_client_event(command)
    }

    /// Completion callback for a retrieval run.
    pub fn finish_turn(&self, turn: u64) -> bool {
        self.turn.lock().complete(turn)
    }

    /// Start retrieval for an operator-supplied query.
    ///
    /// Returns `false` without doing anything if the connection has no
    /// session yet or a turn is already in flight.
    pub fn start_test_query(
        self: &Arc<Self>,
        orchestrator: Arc<RagOrchestrator>,
        query: String,
    ) -> bool {
        if self.session().is_none() {
            return false;
        }
        let Some(turn) = self.turn.lock().begin_processing() else {
            return false;
        };
        self.dispatch_rag(orchestrator, turn, query);
        true
    }

    /// Run retrieval for `turn` in the background.
    ///
    /// The task is tied to this connection: it stops when the connection is
    /// torn down. The caller keeps processing events while it runs.
    pub fn dispatch_rag(
        self: &Arc<Self>,
        orchestrator: Arc<RagOrchestrator>,
        turn: u64,
        transcript: String,
    ) {
        let Some(sink) = self.session() else {
            tracing::warn!(connection_id = %self.id, turn, "No upstream session for RAG turn");
            self.finish_turn(turn);
            return;
        };

        let conn = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(connection_id = %conn.id, turn, "RAG turn started: {}", transcript);
            let cancel = conn.cancel.clone();
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(connection_id = %conn.id, turn, "RAG turn cancelled");
                }
                outcome = orchestrator.run(sink.as_ref(), &transcript, || conn.finish_turn(turn)) => {
                    let result = match &outcome {
                        RagOutcome::Answered(_) => "answered",
                        RagOutcome::NoDocuments => "no_documents",
                        RagOutcome::Failed(_) => "failed",
                    };
                    tracing::info!(connection_id = %conn.id, turn, result, "RAG turn finished");
                }
            }
        });
    }

    /// Summary for the connections listing.
    pub fn summary(&self) -> ConnectionSummary {
        ConnectionSummary {
            id: self.id,
            rag_enabled: self.rag_enabled(),
            phase: self.phase().as_str(),
            session_connected: self.session().is_some_and(|s| s.is_ready()),
        }
    }
}

/// Snapshot of one tracked connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub id: Uuid,
    pub rag_enabled: bool,
    pub phase: &'static str,
    pub session_connected: bool,
}

// =============================================================================
// Registry
// =============================================================================

/// All live connections, keyed by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, Arc<ConnectionState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection with the given initial gate.
    pub fn register(&self, rag_enabled: bool) -> Arc<ConnectionState> {
        let state = Arc::new(ConnectionState::new(rag_enabled));
        self.connections.insert(state.id(), state.clone());
        state
    }

    /// Stop tracking a connection and cancel its background work.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<ConnectionState>> {
        let (_, state) = self.connections.remove(id)?;
        state.cancel.cancel();
        Some(state)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<ConnectionState>> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn summaries(&self) -> Vec<ConnectionSummary> {
        self.connections
            .iter()
            .map(|entry| entry.value().summary())
            .collect()
    }

    /// Apply a control command to one connection, or to all of them when
    /// `target` is `None`. Returns how many connections acted on it.
    pub fn apply(
        &self,
        command: &ControlCommand,
        target: Option<Uuid>,
        orchestrator: &Arc<RagOrchestrator>,
    ) -> usize {
        // Collect first so no map shard lock is held while acting.
        let targets: Vec<Arc<ConnectionState>> = match target {
            Some(id) => self.get(&id).into_iter().collect(),
            None => self
                .connections
                .iter()
                .map(|entry| entry.value().clone())
                .collect(),
        };

        let applied = targets
            .iter()
            .filter(|conn| match command {
                ControlCommand::EnableRag => {
                    conn.set_rag_enabled(true);
                    true
                }
                ControlCommand::DisableRag => {
                    conn.set_rag_enabled(false);
                    true
                }
                ControlCommand::TestQuery { query } => {
                    conn.start_test_query(orchestrator.clone(), query.clone())
                }
            })
            .count();

        tracing::info!(
            command = command.name(),
            targeted = targets.len(),
            applied,
            "Control command applied"
        );
        applied
    }
}
