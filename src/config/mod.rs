//! Configuration module for the RAG relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_rag_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::rag::{CompletionConfig, RagSettings, SearchConfig};
use crate::core::realtime::RealtimeConfig;

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the relay, including:
/// - Server settings (host, port, TLS)
/// - Upstream realtime session settings
/// - Completion and search backends used for retrieval
/// - RAG tunables
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Realtime session
    /// OpenAI API key for the Realtime API (required)
    pub openai_api_key: Option<String>,
    pub realtime_url: String,
    pub realtime_model: String,
    /// When set, input transcription is enabled on every new session
    pub realtime_transcription_model: Option<String>,
    pub realtime_connect_timeout_seconds: u64,

    // Completion
    pub completion_url: String,
    pub completion_model: String,
    /// Falls back to `openai_api_key` when unset
    pub completion_api_key: Option<String>,

    // Search
    pub search_endpoint: Option<String>,
    pub search_index: Option<String>,
    pub search_api_key: Option<String>,
    pub search_content_field: String,
    pub search_api_version: String,

    // RAG behaviour
    /// Initial RAG gate of new connections
    pub rag_enabled_by_default: bool,
    pub rag_max_documents: usize,
    pub rag_document_char_budget: usize,
    pub rag_max_output_tokens: u32,
    pub rag_temperature: f32,
    pub rag_injection_delay_ms: u64,
    pub rag_timeout_seconds: u64,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.completion_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.search_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// The `.env` file is loaded in `main` before this is called, so its values
    /// are visible here as ordinary environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Session settings for one upstream realtime connection.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
            transcription_model: self.realtime_transcription_model.clone(),
            connect_timeout: Duration::from_secs(self.realtime_connect_timeout_seconds),
        }
    }

    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            url: self.completion_url.clone(),
            model: self.completion_model.clone(),
            api_key: self
                .completion_api_key
                .clone()
                .or_else(|| self.openai_api_key.clone())
                .unwrap_or_default(),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            endpoint: self.search_endpoint.clone(),
            index: self.search_index.clone(),
            api_key: self.search_api_key.clone(),
            content_field: self.search_content_field.clone(),
            api_version: self.search_api_version.clone(),
        }
    }

    pub fn rag_settings(&self) -> RagSettings {
        RagSettings {
            max_documents: self.rag_max_documents,
            document_char_budget: self.rag_document_char_budget,
            max_output_tokens: self.rag_max_output_tokens,
            temperature: self.rag_temperature,
            injection_delay: Duration::from_millis(self.rag_injection_delay_ms),
            timeout: Duration::from_secs(self.rag_timeout_seconds),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    use crate::core::rag::completion::{DEFAULT_COMPLETION_MODEL, OPENAI_CHAT_COMPLETIONS_URL};
    use crate::core::rag::search::{DEFAULT_CONTENT_FIELD, DEFAULT_SEARCH_API_VERSION};
    use crate::core::realtime::OPENAI_REALTIME_URL;

    ServerConfig {
        host: "localhost".to_string(),
        port: 3001,
        tls: None,
        openai_api_key: Some("sk-test".to_string()),
        realtime_url: OPENAI_REALTIME_URL.to_string(),
        realtime_model: "gpt-4o-realtime-preview".to_string(),
        realtime_transcription_model: None,
        realtime_connect_timeout_seconds: 10,
        completion_url: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
        completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
        completion_api_key: None,
        search_endpoint: None,
        search_index: None,
        search_api_key: None,
        search_content_field: DEFAULT_CONTENT_FIELD.to_string(),
        search_api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
        rag_enabled_by_default: false,
        rag_max_documents: 2,
        rag_document_char_budget: 300,
        rag_max_output_tokens: 200,
        rag_temperature: 0.7,
        rag_injection_delay_ms: 200,
        rag_timeout_seconds: 30,
        cors_allowed_origins: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "OPENAI_API_KEY",
        "REALTIME_URL",
        "REALTIME_MODEL",
        "REALTIME_TRANSCRIPTION_MODEL",
        "REALTIME_CONNECT_TIMEOUT_SECONDS",
        "COMPLETION_URL",
        "COMPLETION_MODEL",
        "COMPLETION_API_KEY",
        "SEARCH_ENDPOINT",
        "SEARCH_INDEX",
        "SEARCH_API_KEY",
        "SEARCH_CONTENT_FIELD",
        "SEARCH_API_VERSION",
        "RAG_ENABLED_BY_DEFAULT",
        "RAG_MAX_DOCUMENTS",
        "RAG_DOCUMENT_CHAR_BUDGET",
        "RAG_MAX_OUTPUT_TOKENS",
        "RAG_TEMPERATURE",
        "RAG_INJECTION_DELAY_MS",
        "RAG_TIMEOUT_SECONDS",
        "CORS_ALLOWED_ORIGINS",
    ];

    pub(super) fn cleanup_env_vars() {
        for var in ENV_VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_address() {
        let config = test_config();
        assert_eq!(config.address(), "localhost:3001");
        assert!(!config.is_tls_enabled());
    }

    #[test]
    fn test_completion_key_falls_back_to_openai_key() {
        let mut config = test_config();
        assert_eq!(config.completion_config().api_key, "sk-test");

        config.completion_api_key = Some("sk-completion".to_string());
        assert_eq!(config.completion_config().api_key, "sk-completion");
    }

    #[test]
    fn test_rag_settings_conversion() {
        let settings = test_config().rag_settings();
        assert_eq!(settings, RagSettings::default());
    }

    #[test]
    fn test_realtime_config_conversion() {
        let mut config = test_config();
        config.realtime_transcription_model = Some("whisper-1".to_string());
        config.realtime_connect_timeout_seconds = 3;

        let realtime = config.realtime_config();
        assert_eq!(realtime.api_key, "sk-test");
        assert_eq!(realtime.transcription_model.as_deref(), Some("whisper-1"));
        assert_eq!(realtime.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    #[serial]
    fn test_from_env_requires_openai_key() {
        cleanup_env_vars();

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.realtime_url, "wss://api.openai.com/v1/realtime");
        assert_eq!(config.realtime_model, "gpt-4o-realtime-preview");
        assert_eq!(config.completion_model, "gpt-4o-mini");
        assert_eq!(config.search_content_field, "content");
        assert!(!config.rag_enabled_by_default);
        assert_eq!(config.rag_settings(), RagSettings::default());
        assert!(config.tls.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("PORT", "8080");
            env::set_var("RAG_ENABLED_BY_DEFAULT", "true");
            env::set_var("RAG_MAX_DOCUMENTS", "4");
            env::set_var("RAG_TEMPERATURE", "0.2");
            env::set_var("SEARCH_ENDPOINT", "https://acme.search.windows.net");
            env::set_var("SEARCH_INDEX", "kb");
            env::set_var("REALTIME_TRANSCRIPTION_MODEL", "gpt-4o-mini-transcribe");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.rag_enabled_by_default);
        assert_eq!(config.rag_max_documents, 4);
        assert!((config.rag_temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.search_config().is_configured());
        assert_eq!(
            config.realtime_transcription_model.as_deref(),
            Some("gpt-4o-mini-transcribe")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("PORT", "not-a-port");
        }

        let result = ServerConfig::from_env();
        assert!(result.unwrap_err().to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

realtime:
  api_key: "sk-yaml"

rag:
  enabled_by_default: true
  timeout_seconds: 5
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("OPENAI_API_KEY", "sk-env");
            env::set_var("RAG_MAX_DOCUMENTS", "3");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-yaml"));
        assert!(config.rag_enabled_by_default);
        assert_eq!(config.rag_timeout_seconds, 5);
        // ENV value kept where YAML is silent
        assert_eq!(config.rag_max_documents, 3);
        assert_eq!(config.port, 8080);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_invalid_temperature() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
realtime:
  api_key: "sk-yaml"
rag:
  temperature: 3.5
"#,
        )
        .unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.unwrap_err().to_string().contains("temperature"));

        cleanup_env_vars();
    }
}
