//! Realtime relay WebSocket handler
//!
//! Each `/realtime` client is paired with one upstream OpenAI Realtime
//! session. Frames pass through unchanged in both directions except where
//! the connection's turn interceptor decides otherwise:
//!
//! ## Client → Provider
//!
//! - JSON events with a `type` field, forwarded verbatim
//! - `response.create` is dropped while a diverted turn is in flight
//! - Frames sent before the session is up are queued and replayed in order
//! - Binary and unparseable frames are dropped
//!
//! ## Provider → Client
//!
//! - Every event is relayed verbatim while RAG is off
//! - While RAG is on, the provider's own reply to a user turn is suppressed
//!   and replaced by a synthesized answer injected into the session
//! - A provider close closes the client

mod handler;
pub mod messages;

pub use handler::realtime_handler;
