//! Test doubles shared by the core unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::rag::{
    CompletionClient, CompletionError, CompletionRequest, Document, DocumentSearch, SearchError,
};
use crate::core::realtime::openai::ClientEvent;
use crate::core::realtime::{RealtimeError, RealtimeResult, RealtimeSink};

/// Sink that records what would have been sent upstream.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClientEvent>>,
    raw: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn closed() -> Self {
        let sink = Self::default();
        sink.closed.store(true, Ordering::SeqCst);
        sink
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    pub fn raw(&self) -> Vec<String> {
        self.raw.lock().clone()
    }

    /// Text of every injected assistant item, in order.
    pub fn injected_texts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ClientEvent::ConversationItemCreate { item } => item
                    .content
                    .as_ref()
                    .and_then(|parts| parts.first())
                    .and_then(|part| part.text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RealtimeSink for RecordingSink {
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.events.lock().push(event);
        Ok(())
    }

    async fn send_raw(&self, text: String) -> RealtimeResult<()> {
        if !self.is_ready() {
            return Err(RealtimeError::NotConnected);
        }
        self.raw.lock().push(text);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

pub enum SearchBehavior {
    Documents(Vec<Document>),
    Fail,
    Hang,
}

pub struct StaticSearch {
    behavior: SearchBehavior,
}

impl StaticSearch {
    pub fn documents(contents: &[&str]) -> Self {
        Self {
            behavior: SearchBehavior::Documents(
                contents.iter().map(|c| Document::new(*c)).collect(),
            ),
        }
    }

    pub fn failing() -> Self {
        Self {
            behavior: SearchBehavior::Fail,
        }
    }

    pub fn hanging() -> Self {
        Self {
            behavior: SearchBehavior::Hang,
        }
    }
}

#[async_trait]
impl DocumentSearch for StaticSearch {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<Document>, SearchError> {
        match &self.behavior {
            SearchBehavior::Documents(docs) => Ok(docs.iter().take(limit).cloned().collect()),
            SearchBehavior::Fail => Err(SearchError::Request("connection refused".to_string())),
            SearchBehavior::Hang => std::future::pending().await,
        }
    }
}

pub struct StaticCompletion {
    answer: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StaticCompletion {
    pub fn answer(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            requests: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl CompletionClient for StaticCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().push(request);
        self.answer.clone().ok_or(CompletionError::Status {
            status: 500,
            body: "internal error".to_string(),
        })
    }
}
