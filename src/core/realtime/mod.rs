//! Upstream realtime speech sessions.
//!
//! Each downstream client gets exactly one upstream session. The session task
//! reports provider frames as [`SessionEvent`]s and accepts writes through a
//! [`RealtimeSink`], which the relay and the RAG side channel share.

mod base;
pub mod openai;

pub use base::{
    ConnectionStatus, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSink, SessionEvent,
};
pub use openai::{
    ClientCommand, ClientEvent, OPENAI_REALTIME_URL, OpenAIRealtime, OpenAIRealtimeHandle,
    OpenAIRealtimeModel, ServerEvent,
};
