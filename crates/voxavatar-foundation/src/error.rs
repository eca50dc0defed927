use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error("Input device unavailable: {name:?}")]
    DeviceUnavailable { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("CPAL error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => {
                AudioError::DeviceUnavailable { name: None }
            }
            cpal::BuildStreamError::StreamConfigNotSupported => AudioError::FormatNotSupported {
                format: "requested stream config".to_string(),
            },
            cpal::BuildStreamError::BackendSpecific { err }
                if err.description.to_lowercase().contains("permission")
                    || err.description.to_lowercase().contains("denied") =>
            {
                AudioError::PermissionDenied
            }
            other => AudioError::Fatal(format!("Build stream error: {}", other)),
        }
    }
}

impl AudioError {
    /// Errors that make a session start impossible; surfaced to the user, no retry.
    pub fn is_fatal_to_start(&self) -> bool {
        matches!(
            self,
            AudioError::PermissionDenied | AudioError::DeviceUnavailable { .. }
        )
    }
}
