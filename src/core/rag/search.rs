//! Document retrieval.
//!
//! Retrieval is a black box to the relay: a query goes in, an ordered list of
//! documents comes out. [`HttpDocumentSearch`] talks to an Azure AI Search
//! style index over HTTPS.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Default search REST API version.
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";

/// Default field holding document text.
pub const DEFAULT_CONTENT_FIELD: &str = "content";

/// One retrieved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Errors from the retrieval backend.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend not configured: {0}")]
    NotConfigured(String),

    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}

/// Ranked document lookup.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Return at most `limit` documents for `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Document>, SearchError>;
}

/// Connection settings for [`HttpDocumentSearch`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Service root, e.g. `https://my-search.search.windows.net`
    pub endpoint: Option<String>,
    pub index: Option<String>,
    pub api_key: Option<String>,
    /// Field of each hit that carries the document text
    pub content_field: String,
    pub api_version: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            index: None,
            api_key: None,
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
            api_version: DEFAULT_SEARCH_API_VERSION.to_string(),
        }
    }
}

impl Drop for SearchConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.api_key {
            key.zeroize();
        }
    }
}

impl SearchConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.index.is_some()
    }

    /// Full URL of the index's search action.
    pub fn search_url(&self) -> Result<String, SearchError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| SearchError::NotConfigured("SEARCH_ENDPOINT is not set".to_string()))?;
        let index = self
            .index
            .as_deref()
            .ok_or_else(|| SearchError::NotConfigured("SEARCH_INDEX is not set".to_string()))?;
        Ok(format!(
            "{}/indexes/{}/docs/search?api-version={}",
            endpoint.trim_end_matches('/'),
            index,
            self.api_version
        ))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Full-text search over an HTTP index.
pub struct HttpDocumentSearch {
    client: Client,
    config: SearchConfig,
}

impl HttpDocumentSearch {
    pub fn new(client: Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl DocumentSearch for HttpDocumentSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Document>, SearchError> {
        let url = self.config.search_url()?;

        let mut request = self
            .client
            .post(&url)
            .json(&json!({ "search": query, "top": limit }));
        if let Some(key) = &self.config.api_key {
            request = request.header("api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let field = self.config.content_field.as_str();
        let documents: Vec<Document> = parsed
            .value
            .into_iter()
            .filter_map(|mut hit| match hit.remove(field) {
                Some(serde_json::Value::String(text)) => Some(Document::new(text)),
                Some(other) if !other.is_null() => Some(Document::new(other.to_string())),
                _ => None,
            })
            .take(limit)
            .collect();

        tracing::debug!(hits = documents.len(), "Document search finished");
        Ok(documents)
    }
}
