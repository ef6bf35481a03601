//! OpenAI Realtime API WebSocket message types.
//!
//! The relay forwards provider and client frames byte-for-byte. These types
//! exist for the parts of the protocol the relay has to understand:
//!
//! Client events the relay itself sends:
//! - session.update - Enable input transcription after the handshake
//! - conversation.item.create - Inject a synthesized assistant message
//! - response.create - Ask the provider to speak it
//!
//! Server events the relay classifies:
//! - input_audio_buffer.speech_started / speech_stopped - User speech lifecycle
//! - conversation.item.input_audio_transcription.delta - User transcript fragment
//! - conversation.item.input_audio_transcription.completed - User transcript done
//! - conversation.item.created - Item added to conversation
//! - response.* - Assistant response construction
//! - error - Error occurred
//!
//! Every other server event decodes to [`ServerEvent::Other`] and is relayed
//! unchanged.

use serde::{Deserialize, Serialize};

/// Event type of a client-issued "produce a response" command.
pub const RESPONSE_CREATE: &str = "response.create";

// =============================================================================
// Session Configuration
// =============================================================================

/// Partial session configuration sent with `session.update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "gpt-4o-mini-transcribe")
    pub model: String,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Item role (user, assistant, system)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
}

impl ConversationItem {
    /// Build an assistant-authored text message.
    pub fn assistant_message(text: &str) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            status: None,
            role: Some("assistant".to_string()),
            content: Some(vec![ContentPart {
                content_type: "text".to_string(),
                text: Some(text.to_string()),
                transcript: None,
            }]),
        }
    }

    /// Whether the item is attributed to the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

// =============================================================================
// Response Configuration
// =============================================================================

/// Response configuration for creating responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    /// Instructions for this response only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events the relay sends on its own behalf.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
}

impl ClientEvent {
    /// The wire `type` of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ResponseCreate { .. } => RESPONSE_CREATE,
        }
    }
}

/// Classification of a frame sent by the browser client.
///
/// Only `response.create` matters to the relay; everything else is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// The client asks the provider to produce a response
    ResponseCreate,
    /// Any other client event
    Other {
        /// Wire `type` of the event
        event_type: String,
    },
}

impl ClientCommand {
    /// Classify a client text frame. Fails when the frame is not a JSON
    /// object with a string `type` field.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(if envelope.event_type == RESPONSE_CREATE {
            ClientCommand::ResponseCreate
        } else {
            ClientCommand::Other {
                event_type: envelope.event_type,
            }
        })
    }

    /// The wire `type` of the command.
    pub fn event_type(&self) -> &str {
        match self {
            ClientCommand::ResponseCreate => RESPONSE_CREATE,
            ClientCommand::Other { event_type } => event_type,
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    #[serde(default)]
    id: Option<String>,
}

/// Ids carried by `response.*` events. `response.created` and
/// `response.done` nest the response, streamed parts carry `response_id`.
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    response_id: Option<String>,
    #[serde(default)]
    response: Option<IdRef>,
    #[serde(default)]
    item_id: Option<String>,
    #[serde(default)]
    item: Option<IdRef>,
}

/// Wire shape of the server events the relay decodes.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireServerEvent {
    #[serde(rename = "error")]
    Error { error: ApiError },

    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: Option<u64>,
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: Option<u64>,
        #[serde(default)]
        item_id: Option<String>,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptDone {
        #[serde(default)]
        item_id: Option<String>,
        #[serde(default)]
        transcript: String,
    },

    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated { item: ConversationItem },

    #[serde(other)]
    Unrecognized,
}

/// Server events received from the OpenAI Realtime API, decoded into the
/// closed set the relay acts on.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Error reported by the provider
    Error {
        /// Error details
        error: ApiError,
    },

    /// Speech started (VAD detected speech)
    SpeechStarted {
        /// Audio start timestamp in ms
        audio_start_ms: Option<u64>,
        /// Item ID
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    SpeechStopped {
        /// Audio end timestamp in ms
        audio_end_ms: Option<u64>,
        /// Item ID
        item_id: Option<String>,
    },

    /// Fragment of the user's input transcription
    TranscriptDelta {
        /// Item ID
        item_id: Option<String>,
        /// Text fragment
        delta: String,
    },

    /// User's input transcription is complete
    TranscriptDone {
        /// Item ID
        item_id: Option<String>,
        /// Full transcript as reported by the provider
        transcript: String,
    },

    /// Conversation item created
    ConversationItemCreated {
        /// Created item
        item: ConversationItem,
    },

    /// Any `response.*` event
    Response {
        /// Wire `type` of the event
        event_type: String,
        /// Response the event belongs to
        response_id: Option<String>,
        /// Output item the event refers to
        item_id: Option<String>,
    },

    /// Anything else, relayed untouched
    Other {
        /// Wire `type` of the event
        event_type: String,
    },
}

impl ServerEvent {
    /// Decode a provider text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let wire: WireServerEvent = serde_json::from_str(text)?;
        let event = match wire {
            WireServerEvent::Error { error } => ServerEvent::Error { error },
            WireServerEvent::SpeechStarted {
                audio_start_ms,
                item_id,
            } => ServerEvent::SpeechStarted {
                audio_start_ms,
                item_id,
            },
            WireServerEvent::SpeechStopped {
                audio_end_ms,
                item_id,
            } => ServerEvent::SpeechStopped {
                audio_end_ms,
                item_id,
            },
            WireServerEvent::TranscriptDelta { item_id, delta } => {
                ServerEvent::TranscriptDelta { item_id, delta }
            }
            WireServerEvent::TranscriptDone {
                item_id,
                transcript,
            } => ServerEvent::TranscriptDone {
                item_id,
                transcript,
            },
            WireServerEvent::ConversationItemCreated { item } => {
                ServerEvent::ConversationItemCreated { item }
            }
            WireServerEvent::Unrecognized => {
                let Envelope { event_type } = serde_json::from_str(text)?;
                if event_type.starts_with("response.") {
                    let envelope: ResponseEnvelope = serde_json::from_str(text)?;
                    ServerEvent::Response {
                        event_type: envelope.event_type,
                        response_id: envelope
                            .response_id
                            .or_else(|| envelope.response.and_then(|r| r.id)),
                        item_id: envelope.item_id.or_else(|| envelope.item.and_then(|i| i.id)),
                    }
                } else {
                    ServerEvent::Other { event_type }
                }
            }
        };
        Ok(event)
    }

    /// Whether this event is part of the assistant building a response:
    /// streamed `response.*` output or an assistant-authored item.
    pub fn is_response_construction(&self) -> bool {
        match self {
            ServerEvent::Response { .. } => true,
            ServerEvent::ConversationItemCreated { item } => item.is_assistant(),
            _ => false,
        }
    }

    /// The wire `type` of the event.
    pub fn event_type(&self) -> &str {
        match self {
            ServerEvent::Error { .. } => "error",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            ServerEvent::TranscriptDelta { .. } => {
                "conversation.item.input_audio_transcription.delta"
            }
            ServerEvent::TranscriptDone { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            ServerEvent::ConversationItemCreated { .. } => "conversation.item.created",
            ServerEvent::Response { event_type, .. } | ServerEvent::Other { event_type } => event_type,
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    pub message: String,
}

// =============================================================================
// Tests
// =============================================================================
