use std::path::PathBuf;

use clap::Parser;

/// Default instructions handed to the agent when no file is given.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly avatar assistant. \
Introduce yourself briefly, answer in short spoken-style sentences, wait for \
the user's reply before moving on, and thank them at the end of the \
conversation.";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "voxavatar",
    about = "Voice conversation with a streaming talking avatar"
)]
pub struct Cli {
    /// Input device name (system default when omitted)
    #[arg(short = 'D', long)]
    pub device: Option<String>,

    /// Transcription service WebSocket endpoint
    #[arg(
        long,
        env = "VOXAVATAR_TRANSCRIBER_URL",
        default_value = "ws://localhost:5000"
    )]
    pub transcriber_url: String,

    /// Avatar service base URL
    #[arg(long, env = "AVATAR_API_URL", default_value = "https://api.heygen.com")]
    pub avatar_api_url: String,

    /// Avatar service API key
    #[arg(long, env = "AVATAR_API_KEY", hide_env_values = true)]
    pub avatar_api_key: String,

    /// Avatar to render
    #[arg(long, default_value = "Elenora_IT_Sitting_public")]
    pub avatar_id: String,

    /// Voice the avatar speaks with
    #[arg(long, default_value = "49e3e441c5874cbab3a9e8086b927e8b")]
    pub voice_id: String,

    /// Conversation language
    #[arg(long, default_value = "Spanish")]
    pub language: String,

    /// Agent completion service base URL
    #[arg(long, env = "AGENT_API_URL", default_value = "https://api.openai.com")]
    pub agent_api_url: String,

    /// Agent API key
    #[arg(long, env = "AGENT_API_KEY", hide_env_values = true)]
    pub agent_api_key: String,

    /// Agent model
    #[arg(long, default_value = "gpt-4o")]
    pub agent_model: String,

    /// File with system instructions for the agent
    #[arg(long)]
    pub instructions_file: Option<PathBuf>,
}

impl Cli {
    pub fn instructions(&self) -> std::io::Result<String> {
        match &self.instructions_file {
            Some(path) => std::fs::read_to_string(path),
            None => Ok(DEFAULT_INSTRUCTIONS.to_string()),
        }
    }
}
