use tracing::{info, warn};

use crate::types::{AgentContext, AgentError};
use crate::AgentBackend;

/// Reply used when the backend cannot complete a request. The
/// conversation carries on; the failure is logged, never propagated.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request.";

/// Enforces the conversation contract around a completion backend.
pub struct ConversationAgent<B: AgentBackend> {
    backend: B,
    context: Option<AgentContext>,
}

impl<B: AgentBackend> ConversationAgent<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            context: None,
        }
    }

    /// Create the conversation context. Idempotent: a repeated call
    /// without a prior reset is a no-op and the original context, with
    /// its history, is kept.
    pub async fn initialize(&mut self, instructions: &str) -> Result<(), AgentError> {
        if self.context.is_some() {
            info!("Agent already initialized; keeping existing context");
            return Ok(());
        }
        let context = self.backend.create_context(instructions).await?;
        self.context = Some(context);
        info!("Agent conversation context created");
        Ok(())
    }

    /// Run one turn. Fails with `NotInitialized` when called before
    /// `initialize`; a backend failure resolves to [`FALLBACK_REPLY`].
    pub async fn get_response(&mut self, user_text: &str) -> Result<String, AgentError> {
        let context = self.context.as_mut().ok_or(AgentError::NotInitialized)?;

        match self.backend.complete(context, user_text).await {
            Ok(reply) => Ok(reply),
            Err(AgentError::NotInitialized) => Err(AgentError::NotInitialized),
            Err(e) => {
                warn!("Agent request failed, using fallback reply: {}", e);
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }

    /// Drop the context; the next `initialize` creates a fresh one.
    pub fn reset(&mut self) {
        self.context = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Number of messages accumulated in the current context.
    pub fn history_len(&self) -> usize {
        self.context.as_ref().map(|c| c.history.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAgentBackend;

    #[tokio::test]
    async fn initialize_twice_creates_one_context() {
        let backend = MockAgentBackend::new();
        let contexts = backend.contexts_created();
        let mut agent = ConversationAgent::new(backend);

        agent.initialize("be helpful").await.unwrap();
        agent.initialize("be helpful").await.unwrap();

        assert_eq!(contexts.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(agent.is_initialized());
    }

    #[tokio::test]
    async fn get_response_before_initialize_is_a_contract_error() {
        let mut agent = ConversationAgent::new(MockAgentBackend::new());
        let err = agent.get_response("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::NotInitialized));
    }

    #[tokio::test]
    async fn backend_failure_resolves_to_fallback() {
        let backend = MockAgentBackend::new().failing();
        let mut agent = ConversationAgent::new(backend);
        agent.initialize("be helpful").await.unwrap();

        let reply = agent.get_response("hello").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn successful_turns_accumulate_history() {
        let backend = MockAgentBackend::new().with_reply("hi!");
        let mut agent = ConversationAgent::new(backend);
        agent.initialize("be helpful").await.unwrap();

        let reply = agent.get_response("hello").await.unwrap();
        assert_eq!(reply, "hi!");
        // One user message, one assistant message.
        assert_eq!(agent.history_len(), 2);
    }

    #[tokio::test]
    async fn reset_allows_a_fresh_context() {
        let backend = MockAgentBackend::new();
        let contexts = backend.contexts_created();
        let mut agent = ConversationAgent::new(backend);

        agent.initialize("first").await.unwrap();
        agent.reset();
        assert!(!agent.is_initialized());
        agent.initialize("second").await.unwrap();

        assert_eq!(contexts.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
