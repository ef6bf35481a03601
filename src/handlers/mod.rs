//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `connections` - Operator view of live relay connections
//! - `realtime` - Client channel of the relay (WebSocket)
//! - `webhook` - Control channel toggling RAG per connection

pub mod api;
pub mod connections;
pub mod realtime;
pub mod webhook;

pub use realtime::realtime_handler;
pub use webhook::webhook_handler;
