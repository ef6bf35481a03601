//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::config::ServerConfig;
use crate::core::connections::ConnectionRegistry;
use crate::core::rag::{
    CompletionClient, DocumentSearch, HttpDocumentSearch, OpenAICompletionClient, RagOrchestrator,
};

/// Keep-alive for pooled HTTP connections to the search and completion APIs.
const HTTP_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// State shared by every route.
pub struct AppState {
    pub config: ServerConfig,
    /// Live `/realtime` connections
    pub connections: ConnectionRegistry,
    pub orchestrator: Arc<RagOrchestrator>,
}

impl AppState {
    /// Build state with the HTTP search and completion backends from `config`.
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let http = Client::builder()
            .pool_idle_timeout(HTTP_POOL_IDLE_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build tuned HTTP client, using defaults: {}", e);
                Client::new()
            });

        let search_config = config.search_config();
        if !search_config.is_configured() {
            tracing::warn!(
                "Search backend not configured (SEARCH_ENDPOINT/SEARCH_INDEX); RAG turns will answer with the error fallback"
            );
        }

        let search: Arc<dyn DocumentSearch> =
            Arc::new(HttpDocumentSearch::new(http.clone(), search_config));
        let completion: Arc<dyn CompletionClient> =
            Arc::new(OpenAICompletionClient::new(http, config.completion_config()));

        Self::with_backends(config, search, completion)
    }

    /// Build state around caller-supplied retrieval backends.
    pub fn with_backends(
        config: ServerConfig,
        search: Arc<dyn DocumentSearch>,
        completion: Arc<dyn CompletionClient>,
    ) -> Arc<Self> {
        let orchestrator = Arc::new(RagOrchestrator::new(
            search,
            completion,
            config.rag_settings(),
        ));

        Arc::new(Self {
            config,
            connections: ConnectionRegistry::new(),
            orchestrator,
        })
    }
}
