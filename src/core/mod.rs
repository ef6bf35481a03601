pub mod connections;
pub mod interceptor;
pub mod rag;
pub mod realtime;

#[cfg(test)]
pub(crate) mod testing;

pub use connections::{ConnectionRegistry, ConnectionState, ConnectionSummary, ControlCommand};
pub use interceptor::{ClientDecision, ProviderDecision, TurnInterceptor, TurnPhase};
pub use rag::{
    CompletionClient, DocumentSearch, RagError, RagOrchestrator, RagOutcome, RagSettings,
};
pub use realtime::{
    OpenAIRealtime, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSink, SessionEvent,
};
