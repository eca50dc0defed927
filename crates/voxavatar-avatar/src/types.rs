use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEmotion {
    Neutral,
    Friendly,
    Excited,
    Serious,
}

/// Session creation parameters for the avatar service.
#[derive(Debug, Clone, Serialize)]
pub struct AvatarSessionConfig {
    pub avatar_id: String,
    pub quality: AvatarQuality,
    pub voice_id: String,
    /// Speech rate, 0.5 - 1.5.
    pub voice_rate: f32,
    pub emotion: VoiceEmotion,
    pub language: String,
}

impl Default for AvatarSessionConfig {
    fn default() -> Self {
        Self {
            avatar_id: String::new(),
            quality: AvatarQuality::Medium,
            voice_id: String::new(),
            voice_rate: 1.0,
            emotion: VoiceEmotion::Friendly,
            language: "English".to_string(),
        }
    }
}

/// An established avatar session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    /// Realtime endpoint carrying session events, when the service
    /// provides one.
    pub realtime_url: Option<String>,
}

/// Acknowledgment of a speak request.
#[derive(Debug, Clone, Default)]
pub struct SpeakAck {
    pub task_id: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Opaque handle to the avatar's video stream; the app attaches it to
/// its video sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStreamHandle {
    pub url: String,
}

/// Unsolicited events from the avatar service.
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarEvent {
    StreamReady(MediaStreamHandle),
    StreamDisconnected,
}
