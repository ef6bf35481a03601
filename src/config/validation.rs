use super::ServerConfig;

/// Run every check against the merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_openai_key(&config.openai_api_key)?;
    validate_realtime(config)?;
    validate_rag(config)?;
    validate_urls(config)?;
    Ok(())
}

/// The relay cannot open any session without a key.
fn validate_openai_key(key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match key.as_deref() {
        Some(k) if !k.trim().is_empty() => Ok(()),
        _ => Err("OPENAI_API_KEY is required (set it in the environment or realtime.api_key in YAML)".into()),
    }
}

fn validate_realtime(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.realtime_connect_timeout_seconds == 0 {
        return Err("Realtime connect timeout must be at least 1 second".into());
    }
    Ok(())
}

fn validate_rag(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=2.0).contains(&config.rag_temperature) {
        return Err(format!(
            "RAG temperature must be between 0.0 and 2.0, got {}",
            config.rag_temperature
        )
        .into());
    }
    if config.rag_max_documents == 0 {
        return Err("RAG max documents must be at least 1".into());
    }
    if config.rag_document_char_budget == 0 {
        return Err("RAG document character budget must be at least 1".into());
    }
    if config.rag_max_output_tokens == 0 {
        return Err("RAG max output tokens must be at least 1".into());
    }
    if config.rag_timeout_seconds == 0 {
        return Err("RAG timeout must be at least 1 second".into());
    }
    Ok(())
}

fn validate_urls(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let realtime = url::Url::parse(&config.realtime_url)
        .map_err(|e| format!("Invalid REALTIME_URL '{}': {e}", config.realtime_url))?;
    if !matches!(realtime.scheme(), "ws" | "wss") {
        return Err(format!(
            "REALTIME_URL must use ws:// or wss://, got '{}'",
            config.realtime_url
        )
        .into());
    }

    url::Url::parse(&config.completion_url)
        .map_err(|e| format!("Invalid COMPLETION_URL '{}': {e}", config.completion_url))?;

    if let Some(endpoint) = &config.search_endpoint {
        url::Url::parse(endpoint)
            .map_err(|e| format!("Invalid SEARCH_ENDPOINT '{endpoint}': {e}"))?;
    }
    Ok(())
}
