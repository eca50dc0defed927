use thiserror::Error;

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Failed to acquire session token: {0}")]
    Token(String),

    #[error("Failed to create avatar session: {0}")]
    Session(String),

    #[error("Speak request failed: {0}")]
    Speak(String),

    #[error("Avatar stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed service response: {0}")]
    Protocol(String),
}
