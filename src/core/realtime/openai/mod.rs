//! OpenAI Realtime API module.
//!
//! One [`OpenAIRealtime`] is one upstream WebSocket session. The relay does not
//! interpret audio; it reads just enough of the event stream to know where a
//! user turn starts and ends.
//!
//! # Supported Models
//!
//! - `gpt-4o-realtime-preview` - GPT-4o Realtime Preview
//! - `gpt-4o-realtime-preview-2024-12-17` - December 2024 version
//! - `gpt-4o-mini-realtime-preview` - Mini model for lower latency
//!
//! Any other name is passed through to the provider unchanged.

mod client;
mod config;
mod messages;

pub use client::{OpenAIRealtime, OpenAIRealtimeHandle};
pub use config::{OPENAI_REALTIME_BETA_HEADER, OPENAI_REALTIME_URL, OpenAIRealtimeModel};
pub use messages::{
    ApiError, ClientCommand, ClientEvent, ContentPart, ConversationItem, InputAudioTranscription,
    RESPONSE_CREATE, ResponseConfig, ServerEvent, SessionConfig,
};
