use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent not initialized. Call initialize() first.")]
    NotInitialized,

    #[error("Agent request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// The conversation context: instructions plus accumulated history.
/// Created once per session by `initialize` and carried across turns.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub instructions: String,
    pub history: Vec<ChatMessage>,
}

impl AgentContext {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            history: Vec::new(),
        }
    }
}
