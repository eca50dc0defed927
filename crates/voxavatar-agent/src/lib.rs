//! Conversational agent layer for VoxAvatar
//!
//! The agent backend (an external completion service) is abstracted
//! behind [`AgentBackend`]; [`ConversationAgent`] wraps a backend and
//! enforces the conversation contract: idempotent initialization, a
//! hard error when used before initialization, and a fixed fallback
//! reply when the backend fails.

pub mod conversation;
pub mod http;
pub mod mock;
pub mod types;

pub use conversation::{ConversationAgent, FALLBACK_REPLY};
pub use http::{HttpAgentBackend, HttpAgentConfig};
pub use mock::MockAgentBackend;
pub use types::{AgentContext, AgentError, ChatMessage, Role};

use async_trait::async_trait;

/// A completion service the conversation delegates to.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Create the conversation context that will carry history.
    async fn create_context(&self, instructions: &str) -> Result<AgentContext, AgentError>;

    /// Run one completion over the context plus the user's message,
    /// recording both sides in the context's history on success.
    async fn complete(
        &self,
        context: &mut AgentContext,
        user_text: &str,
    ) -> Result<String, AgentError>;
}
