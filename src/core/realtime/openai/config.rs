//! OpenAI Realtime API configuration types.

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Value of the `OpenAI-Beta` header required by the Realtime API.
pub const OPENAI_REALTIME_BETA_HEADER: &str = "realtime=v1";

// =============================================================================
// Models
// =============================================================================

/// OpenAI Realtime models.
///
/// Unknown names are kept verbatim so newly released models can be used
/// without a gateway release.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeModel {
    /// GPT-4o Realtime Preview model
    #[default]
    #[serde(rename = "gpt-4o-realtime-preview")]
    Gpt4oRealtimePreview,
    /// GPT-4o Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-realtime-preview-2024-12-17")]
    Gpt4oRealtimePreview20241217,
    /// GPT-4o Mini Realtime Preview
    #[serde(rename = "gpt-4o-mini-realtime-preview")]
    Gpt4oMiniRealtimePreview,
    /// Any other model name
    #[serde(untagged)]
    Custom(String),
}

impl OpenAIRealtimeModel {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
            Self::Custom(name) => name,
        }
    }

    /// Parse from string. Empty input selects the default model.
    pub fn from_str_or_default(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Self::default(),
            "gpt-4o-realtime-preview" => Self::Gpt4oRealtimePreview,
            "gpt-4o-realtime-preview-2024-12-17" => Self::Gpt4oRealtimePreview20241217,
            "gpt-4o-mini-realtime-preview" => Self::Gpt4oMiniRealtimePreview,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
