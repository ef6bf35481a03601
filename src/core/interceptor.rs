//! Per-connection turn interception.
//!
//! The interceptor sits on both directions of a connection pair and decides,
//! one event at a time, what the relay does with it. When retrieval is
//! enabled it captures the user's transcript for the current turn, and once
//! the transcript is final hands the turn to the RAG side channel instead of
//! letting the provider answer on its own.
//!
//! ```text
//!            speech_started (rag on)          transcript done (non-empty)
//!   Idle ─────────────────────────► Armed ───────────────────────────► Processing
//!    ▲                                │                                     │
//!    └──── transcript done (empty) ───┘                                     │
//!    └──────────────────── complete(turn) / reset() ────────────────────────┘
//! ```
//!
//! A provider response that starts while a turn is owned stays suppressed
//! until its `response.done`, even after the machine is back to `Idle`.
//!
//! The type is synchronous. Callers hold the per-connection lock
//! only for the duration of one decision.

use std::collections::{HashMap, HashSet};

use crate::core::realtime::{ClientCommand, ServerEvent};

const RESPONSE_DONE: &str = "response.done";

/// Where the connection is in the current user turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnPhase {
    /// Plain relay.
    #[default]
    Idle,
    /// Speech started with RAG enabled; transcript fragments accumulate here.
    Armed {
        /// Concatenated transcript deltas, in arrival order
        transcript: String,
    },
    /// A retrieval side-process owns the turn.
    Processing {
        /// Turn number handed to the side-process
        turn: u64,
    },
}

impl TurnPhase {
    /// Short label for logs and the connections listing.
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Armed { .. } => "armed",
            TurnPhase::Processing { .. } => "processing",
        }
    }
}

/// What to do with an event coming from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderDecision {
    /// Forward the original frame to the client.
    Relay,
    /// Drop the frame.
    Suppress,
    /// Drop the frame and start retrieval for `transcript`.
    Trigger {
        /// Turn number the completion callback must present
        turn: u64,
        /// Trimmed user transcript
        transcript: String,
    },
}

/// What to do with an event coming from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDecision {
    /// Forward the original frame to the provider.
    Forward,
    /// Drop the frame.
    Drop,
}

/// Turn state machine for one connection pair, together with its RAG gate.
#[derive(Debug, Default)]
pub struct TurnInterceptor {
    rag_enabled: bool,
    phase: TurnPhase,
    next_turn: u64,
    /// Provider responses diverted from the client, until their `response.done`
    suppressed_responses: HashSet<String>,
    /// Output items of those responses, keyed to the owning response
    suppressed_items: HashMap<String, String>,
}

impl TurnInterceptor {
    pub fn new(rag_enabled: bool) -> Self {
        Self {
            rag_enabled,
            ..Self::default()
        }
    }

    pub fn rag_enabled(&self) -> bool {
        self.rag_enabled
    }

    /// Set the gate. Turning it off abandons the current turn; returns
    /// `true` if a turn was abandoned.
    pub fn set_rag_enabled(&mut self, enabled: bool) -> bool {
        self.rag_enabled = enabled;
        !enabled && self.reset()
    }

    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    /// Whether a retrieval side-process currently owns the turn.
    pub fn is_processing(&self) -> bool {
        matches!(self.phase, TurnPhase::Processing { .. })
    }

    /// Whether the current turn is being captured for retrieval.
    pub fn is_armed(&self) -> bool {
        matches!(self.phase, TurnPhase::Armed { .. })
    }

    /// Classify one provider event.
    ///
    /// The gate only influences arming; a turn that is already armed or
    /// processing runs to completion unless the gate is turned off.
    pub fn on_provider_event(&mut self, event: &ServerEvent) -> ProviderDecision {
        match event {
            ServerEvent::SpeechStarted { .. } => {
                if self.rag_enabled && !self.is_processing() {
                    self.phase = TurnPhase::Armed {
                        transcript: String::new(),
                    };
                }
                ProviderDecision::Relay
            }

            ServerEvent::TranscriptDelta { delta, .. } => {
                if let TurnPhase::Armed { transcript } = &mut self.phase {
                    transcript.push_str(delta);
                }
                ProviderDecision::Relay
            }

            ServerEvent::TranscriptDone { .. } => {
                let TurnPhase::Armed { transcript } = &self.phase else {
                    return ProviderDecision::Relay;
                };

                let query = transcript.trim().to_string();
                if query.is_empty() {
                    self.phase = TurnPhase::Idle;
                    return ProviderDecision::Relay;
                }

                let turn = self.allocate_turn();
                self.phase = TurnPhase::Processing { turn };
                ProviderDecision::Trigger {
                    turn,
                    transcript: query,
                }
            }

            event if event.is_response_construction() => self.on_response_construction(event),

            _ => ProviderDecision::Relay,
        }
    }

    /// Suppress output of any response that started while a turn was owned,
    /// and any response started now if a turn is owned.
    fn on_response_construction(&mut self, event: &ServerEvent) -> ProviderDecision {
        let (response_id, item_id, done) = match event {
            ServerEvent::Response {
                event_type,
                response_id,
                item_id,
            } => (
                response_id.as_deref(),
                item_id.as_deref(),
                event_type.as_str() == RESPONSE_DONE,
            ),
            ServerEvent::ConversationItemCreated { item } => (None, item.id.as_deref(), false),
            _ => return ProviderDecision::Relay,
        };

        let diverted = response_id.is_some_and(|id| self.suppressed_responses.contains(id))
            || item_id.is_some_and(|id| self.suppressed_items.contains_key(id));
        if !diverted && self.phase == TurnPhase::Idle {
            return ProviderDecision::Relay;
        }

        if let Some(id) = response_id {
            if done {
                self.suppressed_responses.remove(id);
                self.suppressed_items.retain(|_, owner| owner.as_str() != id);
            } else {
                self.suppressed_responses.insert(id.to_string());
                if let Some(item) = item_id {
                    self.suppressed_items.insert(item.to_string(), id.to_string());
                }
            }
        }
        ProviderDecision::Suppress
    }

    /// Classify one client event.
    pub fn on_client_event(&self, command: &ClientCommand) -> ClientDecision {
        match command {
            ClientCommand::ResponseCreate if self.phase != TurnPhase::Idle => ClientDecision::Drop,
            _ => ClientDecision::Forward,
        }
    }

    /// Enter `Processing` without a captured turn, for operator-issued
    /// queries. Returns `None` if a turn is already in flight.
    pub fn begin_processing(&mut self) -> Option<u64> {
        if self.phase != TurnPhase::Idle {
            return None;
        }
        let turn = self.allocate_turn();
        self.phase = TurnPhase::Processing { turn };
        Some(turn)
    }

    /// Completion callback for the side-process started for `turn`.
    ///
    /// Returns `true` if this call moved the machine back to `Idle`. A stale
    /// turn (reset, or superseded) leaves the state untouched.
    pub fn complete(&mut self, turn: u64) -> bool {
        match self.phase {
            TurnPhase::Processing { turn: current } if current == turn => {
                self.phase = TurnPhase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Force `Idle` and drop any captured transcript. Returns `true` if the
    /// machine was not already idle.
    pub fn reset(&mut self) -> bool {
        let was_active = self.phase != TurnPhase::Idle;
        self.phase = TurnPhase::Idle;
        was_active
    }

    fn allocate_turn(&mut self) -> u64 {
        self.next_turn += 1;
        self.next_turn
    }
}
