//! Scriptable in-memory backend for tests and wiring checks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::types::{AgentContext, AgentError, ChatMessage, Role};
use crate::AgentBackend;

pub struct MockAgentBackend {
    reply: String,
    fail: Arc<AtomicBool>,
    delay: Option<Duration>,
    contexts_created: Arc<AtomicUsize>,
    completions: Arc<AtomicUsize>,
}

impl Default for MockAgentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgentBackend {
    pub fn new() -> Self {
        Self {
            reply: "mock reply".to_string(),
            fail: Arc::new(AtomicBool::new(false)),
            delay: None,
            contexts_created: Arc::new(AtomicUsize::new(0)),
            completions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    /// Every completion fails until `set_failing(false)`.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate backend latency; useful for racing turns against events.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Shared counter of contexts ever created; grab before moving the
    /// backend into an agent.
    pub fn contexts_created(&self) -> Arc<AtomicUsize> {
        self.contexts_created.clone()
    }

    pub fn completions(&self) -> Arc<AtomicUsize> {
        self.completions.clone()
    }
}

#[async_trait]
impl AgentBackend for MockAgentBackend {
    async fn create_context(&self, instructions: &str) -> Result<AgentContext, AgentError> {
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(AgentContext::new(instructions))
    }

    async fn complete(
        &self,
        context: &mut AgentContext,
        user_text: &str,
    ) -> Result<String, AgentError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(AgentError::RequestFailed("mock failure".to_string()));
        }

        context.history.push(ChatMessage {
            role: Role::User,
            content: user_text.to_string(),
        });
        context.history.push(ChatMessage {
            role: Role::Assistant,
            content: self.reply.clone(),
        });
        Ok(self.reply.clone())
    }
}
