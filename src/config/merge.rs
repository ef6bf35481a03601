use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig, env};

/// Build the final configuration: environment first, YAML on top.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;
    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml)?;
    }
    Ok(config)
}

fn apply_yaml(
    config: &mut ServerConfig,
    yaml: YamlConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => return Err("server.tls requires both cert_path and key_path".into()),
                }
            }
        }
    }

    if let Some(realtime) = yaml.realtime {
        if realtime.api_key.is_some() {
            config.openai_api_key = realtime.api_key;
        }
        if let Some(url) = realtime.url {
            config.realtime_url = url;
        }
        if let Some(model) = realtime.model {
            config.realtime_model = model;
        }
        if realtime.transcription_model.is_some() {
            config.realtime_transcription_model = realtime.transcription_model;
        }
        if let Some(timeout) = realtime.connect_timeout_seconds {
            config.realtime_connect_timeout_seconds = timeout;
        }
    }

    if let Some(completion) = yaml.completion {
        if let Some(url) = completion.url {
            config.completion_url = url;
        }
        if let Some(model) = completion.model {
            config.completion_model = model;
        }
        if completion.api_key.is_some() {
            config.completion_api_key = completion.api_key;
        }
    }

    if let Some(search) = yaml.search {
        if search.endpoint.is_some() {
            config.search_endpoint = search.endpoint;
        }
        if search.index.is_some() {
            config.search_index = search.index;
        }
        if search.api_key.is_some() {
            config.search_api_key = search.api_key;
        }
        if let Some(field) = search.content_field {
            config.search_content_field = field;
        }
        if let Some(version) = search.api_version {
            config.search_api_version = version;
        }
    }

    if let Some(rag) = yaml.rag {
        if let Some(enabled) = rag.enabled_by_default {
            config.rag_enabled_by_default = enabled;
        }
        if let Some(max) = rag.max_documents {
            config.rag_max_documents = max;
        }
        if let Some(budget) = rag.document_char_budget {
            config.rag_document_char_budget = budget;
        }
        if let Some(tokens) = rag.max_output_tokens {
            config.rag_max_output_tokens = tokens;
        }
        if let Some(temperature) = rag.temperature {
            config.rag_temperature = temperature;
        }
        if let Some(delay) = rag.injection_delay_ms {
            config.rag_injection_delay_ms = delay;
        }
        if let Some(timeout) = rag.timeout_seconds {
            config.rag_timeout_seconds = timeout;
        }
    }

    if let Some(security) = yaml.security {
        if security.cors_allowed_origins.is_some() {
            config.cors_allowed_origins = security.cors_allowed_origins;
        }
    }

    Ok(())
}
