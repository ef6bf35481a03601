//! Frames flowing toward the client socket.

/// What the sender task should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRoute {
    /// Provider text frame, passed through unchanged
    Relay(String),
    /// Close the client socket
    Close,
}

impl ClientRoute {
    pub fn is_close(&self) -> bool {
        matches!(self, ClientRoute::Close)
    }
}
