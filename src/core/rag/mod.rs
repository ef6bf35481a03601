//! Retrieval-augmented answers for intercepted turns.
//!
//! - [`search`]: document lookup ([`DocumentSearch`])
//! - [`completion`]: answer generation ([`CompletionClient`])
//! - [`orchestrator`]: the run that ties them together and speaks the result

use std::time::Duration;
use thiserror::Error;

pub mod completion;
pub mod orchestrator;
pub mod search;

pub use completion::{
    CompletionClient, CompletionConfig, CompletionError, CompletionRequest, OpenAICompletionClient,
};
pub use orchestrator::{
    ERROR_FALLBACK, NO_DOCUMENTS_FALLBACK, RagOrchestrator, RagOutcome, RagSettings, build_context,
};
pub use search::{Document, DocumentSearch, HttpDocumentSearch, SearchConfig, SearchError};

/// Failure of one retrieval run.
#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Completion produced an empty answer")]
    EmptyAnswer,

    #[error("Retrieval timed out after {0:?}")]
    Timeout(Duration),
}
