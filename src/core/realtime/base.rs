//! Base traits and types for the upstream realtime session.
//!
//! A realtime session is one WebSocket connection to the speech provider,
//! owned by exactly one downstream client. Inbound provider frames are handed
//! to the owner as [`SessionEvent`]s; outbound traffic goes through a
//! cloneable [`RealtimeSink`] so that side channels (the RAG orchestrator) can
//! write into the same session the client is relaying through.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::openai::ClientEvent;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Configuration for one upstream realtime session.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// WebSocket endpoint of the provider
    pub url: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview")
    pub model: String,

    /// Input transcription model. When set, the session is configured to
    /// transcribe user audio right after the handshake.
    pub transcription_model: Option<String>,

    /// Upper bound on the WebSocket handshake
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: super::openai::OPENAI_REALTIME_URL.to_string(),
            model: String::new(),
            transcription_model: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Drop for RealtimeConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.api_key.zeroize();
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection status of an upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Currently connecting
    Connecting,
    /// Connected and ready
    Connected,
    /// Connection failed or was closed by the provider
    Failed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Session Events
// =============================================================================

/// Events delivered from the session task to the owner of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A text frame from the provider, untouched.
    Message(String),
    /// The provider closed the connection or the socket failed.
    Closed {
        /// Human readable reason, for logging
        reason: String,
    },
}

// =============================================================================
// Sink Trait
// =============================================================================

/// Write side of an upstream realtime session.
///
/// Implemented by the live session handle and by test doubles. Both the
/// client relay path and the RAG orchestrator write through this trait.
#[async_trait]
pub trait RealtimeSink: Send + Sync {
    /// Send a typed client event to the provider.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()>;

    /// Send a raw, already-encoded text frame to the provider.
    async fn send_raw(&self, text: String) -> RealtimeResult<()>;

    /// Whether the sink can currently accept frames.
    fn is_ready(&self) -> bool;
}
