//! Mock upstream providers for the relay
//!
//! - WebSocket: scripted OpenAI Realtime server (`websocket_mock`)
//! - HTTP: search index and chat completions on `wiremock` (`http_mock`)

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod http_mock;
pub mod websocket_mock;

pub use http_mock::*;
pub use websocket_mock::*;
