//! Retrieval orchestration for intercepted turns.
//!
//! One run takes a finalized user transcript, looks up supporting documents,
//! asks the completion model for a short spoken answer, and injects that
//! answer into the realtime session as an assistant turn. Every run ends in
//! exactly one injection attempt, either the answer or a fallback utterance.

use std::sync::Arc;
use std::time::Duration;

use crate::core::realtime::openai::{ClientEvent, ConversationItem, ResponseConfig};
use crate::core::realtime::{RealtimeResult, RealtimeSink};

use super::RagError;
use super::completion::{CompletionClient, CompletionRequest};
use super::search::{Document, DocumentSearch};

/// Spoken when the search backend finds nothing for the question.
pub const NO_DOCUMENTS_FALLBACK: &str =
    "I couldn't find any information about that in my knowledge base.";

/// Spoken when retrieval or completion fails.
pub const ERROR_FALLBACK: &str =
    "I'm sorry, I ran into a problem looking that up. Could you please ask again?";

/// Tunables for a retrieval run.
#[derive(Debug, Clone, PartialEq)]
pub struct RagSettings {
    /// Documents requested from the search backend
    pub max_documents: usize,
    /// Characters kept from each document when building the context
    pub document_char_budget: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Pause between creating the assistant item and asking for a response
    pub injection_delay: Duration,
    /// Upper bound on retrieval plus completion
    pub timeout: Duration,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            max_documents: 2,
            document_char_budget: 300,
            max_output_tokens: 200,
            temperature: 0.7,
            injection_delay: Duration::from_millis(200),
            timeout: Duration::from_secs(30),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagOutcome {
    /// The completion model produced an answer.
    Answered(String),
    /// Search returned no documents.
    NoDocuments,
    /// Search, completion, or the deadline failed.
    Failed(String),
}

impl RagOutcome {
    /// Text injected into the session for this outcome.
    pub fn utterance(&self) -> &str {
        match self {
            RagOutcome::Answered(text) => text,
            RagOutcome::NoDocuments => NO_DOCUMENTS_FALLBACK,
            RagOutcome::Failed(_) => ERROR_FALLBACK,
        }
    }
}

/// Runs retrieval for intercepted turns.
pub struct RagOrchestrator {
    search: Arc<dyn DocumentSearch>,
    completion: Arc<dyn CompletionClient>,
    settings: RagSettings,
}

impl RagOrchestrator {
    pub fn new(
        search: Arc<dyn DocumentSearch>,
        completion: Arc<dyn CompletionClient>,
        settings: RagSettings,
    ) -> Self {
        Self {
            search,
            completion,
            settings,
        }
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Answer `transcript` and speak the result through `sink`.
    ///
    /// `on_complete` is called exactly once, after the answer (or fallback)
    /// is known and before anything is injected, so that the provider events
    /// produced by the injected turn are relayed normally. If it returns
    /// `false` the turn was abandoned in the meantime and nothing is
    /// injected.
    ///
    /// Never fails; errors are logged and turned into a fallback utterance.
    pub async fn run<F>(&self, sink: &dyn RealtimeSink, transcript: &str, on_complete: F) -> RagOutcome
    where
        F: FnOnce() -> bool + Send,
    {
        let outcome = match tokio::time::timeout(self.settings.timeout, self.answer(transcript)).await {
            Ok(Ok(Some(answer))) => RagOutcome::Answered(answer),
            Ok(Ok(None)) => {
                tracing::info!("No documents found for query");
                RagOutcome::NoDocuments
            }
            Ok(Err(e)) => {
                tracing::error!("RAG request failed: {}", e);
                RagOutcome::Failed(e.to_string())
            }
            Err(_) => {
                let e = RagError::Timeout(self.settings.timeout);
                tracing::error!("RAG request failed: {}", e);
                RagOutcome::Failed(e.to_string())
            }
        };

        if !on_complete() {
            tracing::info!("Turn was reset while retrieval was in flight; not injecting");
            return outcome;
        }

        if let Err(e) = self.inject(sink, outcome.utterance()).await {
            tracing::warn!("Failed to inject synthesized turn: {}", e);
        }
        outcome
    }

    /// Search, then complete. `Ok(None)` means no documents.
    async fn answer(&self, transcript: &str) -> Result<Option<String>, RagError> {
        let documents = self
            .search
            .search(transcript, self.settings.max_documents)
            .await?;
        if documents.is_empty() {
            return Ok(None);
        }
        tracing::debug!(documents = documents.len(), "Building RAG context");

        let context = build_context(&documents, self.settings.document_char_budget);
        let answer = self
            .completion
            .complete(CompletionRequest {
                system: system_prompt(&context),
                user: transcript.to_string(),
                max_tokens: self.settings.max_output_tokens,
                temperature: self.settings.temperature,
            })
            .await?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RagError::EmptyAnswer);
        }
        Ok(Some(answer.to_string()))
    }

    /// Two-step synthesized turn: add the assistant item, wait, then ask the
    /// provider to speak it.
    async fn inject(&self, sink: &dyn RealtimeSink, text: &str) -> RealtimeResult<()> {
        sink.send_event(ClientEvent::ConversationItemCreate {
            item: ConversationItem::assistant_message(text),
        })
        .await?;

        tokio::time::sleep(self.settings.injection_delay).await;

        sink.send_event(ClientEvent::ResponseCreate {
            response: Some(ResponseConfig {
                modalities: Some(vec!["audio".to_string(), "text".to_string()]),
                instructions: Some(format!(
                    "Say the following to the user naturally, without adding anything: {text}"
                )),
            }),
        })
        .await
    }
}

/// Label and truncate documents into one context block.
pub fn build_context(documents: &[Document], char_budget: usize) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let excerpt: String = doc.content.chars().take(char_budget).collect();
            format!("[Document {}]\n{}", i + 1, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn system_prompt(context: &str) -> String {
    format!(
        "You are a helpful voice assistant. Answer the user's question using only the \
         context below. Keep the answer short and conversational, suitable for speaking \
         aloud. If the context does not contain the answer, say so.\n\nContext:\n{context}"
    )
}
