use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// realtime:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview"
///   transcription_model: "gpt-4o-mini-transcribe"
///   connect_timeout_seconds: 10
///
/// completion:
///   model: "gpt-4o-mini"
///
/// search:
///   endpoint: "https://acme.search.windows.net"
///   index: "knowledge-base"
///   api_key: "search-key"
///   content_field: "content"
///
/// rag:
///   enabled_by_default: false
///   max_documents: 2
///   document_char_budget: 300
///   max_output_tokens: 200
///   temperature: 0.7
///   injection_delay_ms: 200
///   timeout_seconds: 30
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub completion: Option<CompletionYaml>,
    pub search: Option<SearchYaml>,
    pub rag: Option<RagYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Upstream realtime session from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub transcription_model: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
}

/// Completion backend from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CompletionYaml {
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Search backend from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SearchYaml {
    pub endpoint: Option<String>,
    pub index: Option<String>,
    pub api_key: Option<String>,
    pub content_field: Option<String>,
    pub api_version: Option<String>,
}

/// RAG tunables from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RagYaml {
    pub enabled_by_default: Option<bool>,
    pub max_documents: Option<usize>,
    pub document_char_budget: Option<usize>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub injection_delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
