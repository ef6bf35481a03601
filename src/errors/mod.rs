//! Error types surfaced over HTTP.
//!
//! Lower layers keep their own `thiserror` enums (`RealtimeError`,
//! `SearchError`, `CompletionError`, `RagError`); only handler-facing failures
//! live here.

pub mod app_error;

pub use app_error::{AppError, AppResult};
