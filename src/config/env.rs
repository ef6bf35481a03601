use std::path::PathBuf;
use std::str::FromStr;

use super::{ServerConfig, TlsConfig};
use crate::core::rag::completion::{DEFAULT_COMPLETION_MODEL, OPENAI_CHAT_COMPLETIONS_URL};
use crate::core::rag::search::{DEFAULT_CONTENT_FIELD, DEFAULT_SEARCH_API_VERSION};
use crate::core::realtime::OPENAI_REALTIME_URL;

/// Default realtime model when `REALTIME_MODEL` is unset.
const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Read a variable, treating blank values as unset.
pub(super) fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable, falling back to `default` when unset.
pub(super) fn parse_env<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("Invalid {key} value '{raw}': {e}").into()),
        None => Ok(default),
    }
}

/// Booleans accept `true/false`, `1/0`, `yes/no` and `on/off`.
pub(super) fn parse_bool_env(key: &str, default: bool) -> Result<bool, Box<dyn std::error::Error>> {
    match env_var(key) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(format!("Invalid {key} value '{raw}': expected a boolean").into()),
        },
        None => Ok(default),
    }
}

fn tls_from_env() -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        _ => Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    }
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_env("PORT", 3001)?,
        tls: tls_from_env()?,

        openai_api_key: env_var("OPENAI_API_KEY"),
        realtime_url: env_var("REALTIME_URL").unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        realtime_model: env_var("REALTIME_MODEL")
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_transcription_model: env_var("REALTIME_TRANSCRIPTION_MODEL"),
        realtime_connect_timeout_seconds: parse_env("REALTIME_CONNECT_TIMEOUT_SECONDS", 10)?,

        completion_url: env_var("COMPLETION_URL")
            .unwrap_or_else(|| OPENAI_CHAT_COMPLETIONS_URL.to_string()),
        completion_model: env_var("COMPLETION_MODEL")
            .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
        completion_api_key: env_var("COMPLETION_API_KEY"),

        search_endpoint: env_var("SEARCH_ENDPOINT"),
        search_index: env_var("SEARCH_INDEX"),
        search_api_key: env_var("SEARCH_API_KEY"),
        search_content_field: env_var("SEARCH_CONTENT_FIELD")
            .unwrap_or_else(|| DEFAULT_CONTENT_FIELD.to_string()),
        search_api_version: env_var("SEARCH_API_VERSION")
            .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),

        rag_enabled_by_default: parse_bool_env("RAG_ENABLED_BY_DEFAULT", false)?,
        rag_max_documents: parse_env("RAG_MAX_DOCUMENTS", 2)?,
        rag_document_char_budget: parse_env("RAG_DOCUMENT_CHAR_BUDGET", 300)?,
        rag_max_output_tokens: parse_env("RAG_MAX_OUTPUT_TOKENS", 200)?,
        rag_temperature: parse_env("RAG_TEMPERATURE", 0.7)?,
        rag_injection_delay_ms: parse_env("RAG_INJECTION_DELAY_MS", 200)?,
        rag_timeout_seconds: parse_env("RAG_TIMEOUT_SECONDS", 30)?,

        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::cleanup_env_vars;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_blank_values_are_unset() {
        cleanup_env_vars();
        unsafe {
            env::set_var("SEARCH_INDEX", "   ");
        }
        assert_eq!(env_var("SEARCH_INDEX"), None);
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_parse_bool_variants() {
        cleanup_env_vars();
        for (raw, expected) in [("yes", true), ("ON", true), ("0", false), ("False", false)] {
            unsafe {
                env::set_var("RAG_ENABLED_BY_DEFAULT", raw);
            }
            assert_eq!(
                parse_bool_env("RAG_ENABLED_BY_DEFAULT", !expected).unwrap(),
                expected
            );
        }

        unsafe {
            env::set_var("RAG_ENABLED_BY_DEFAULT", "maybe");
        }
        assert!(parse_bool_env("RAG_ENABLED_BY_DEFAULT", false).is_err());
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_tls_requires_both_paths() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_CERT_PATH", "/etc/certs/cert.pem");
        }
        assert!(load_from_env().is_err());

        unsafe {
            env::set_var("TLS_KEY_PATH", "/etc/certs/key.pem");
        }
        let config = load_from_env().unwrap();
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/etc/certs/cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/etc/certs/key.pem"));
        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_number_names_variable() {
        cleanup_env_vars();
        unsafe {
            env::set_var("RAG_TIMEOUT_SECONDS", "soon");
        }
        let err = load_from_env().unwrap_err().to_string();
        assert!(err.contains("RAG_TIMEOUT_SECONDS"));
        assert!(err.contains("soon"));
        cleanup_env_vars();
    }
}
