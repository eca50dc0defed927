//! Chat-completions backend over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::types::{AgentContext, AgentError, ChatMessage, Role};
use crate::AgentBackend;

#[derive(Debug, Clone)]
pub struct HttpAgentConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

pub struct HttpAgentBackend {
    client: reqwest::Client,
    config: HttpAgentConfig,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl HttpAgentBackend {
    pub fn new(config: HttpAgentConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AgentBackend for HttpAgentBackend {
    async fn create_context(&self, instructions: &str) -> Result<AgentContext, AgentError> {
        // Chat-completions carries the context client-side; nothing to
        // provision remotely.
        Ok(AgentContext::new(instructions))
    }

    async fn complete(
        &self,
        context: &mut AgentContext,
        user_text: &str,
    ) -> Result<String, AgentError> {
        let mut messages = Vec::with_capacity(context.history.len() + 2);
        messages.push(ChatMessage {
            role: Role::System,
            content: context.instructions.clone(),
        });
        messages.extend(context.history.iter().cloned());
        messages.push(ChatMessage {
            role: Role::User,
            content: user_text.to_string(),
        });

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("Agent completion request ({} messages)", messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "messages": messages,
            }))
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletion = response.json().await?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::RequestFailed("completion had no choices".to_string()))?;

        context.history.push(ChatMessage {
            role: Role::User,
            content: user_text.to_string(),
        });
        context.history.push(ChatMessage {
            role: Role::Assistant,
            content: reply.clone(),
        });
        Ok(reply)
    }
}
