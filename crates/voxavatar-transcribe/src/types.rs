//! Core types for the transcription boundary

use serde::Deserialize;
use thiserror::Error;

/// One finalized speech segment, packaged for transmission.
///
/// Owned by the encoder from creation until handed to the outbound
/// channel; delivery is fire-and-forget.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub segment_id: u64,
    /// Raw little-endian i16 PCM captured over the segment.
    pub bytes: Vec<u8>,
}

/// Messages arriving from the transcription service.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    /// A finished transcript. Blank text is the consumer's concern.
    Transcription { text: String },
    /// Service-side failure report; logged, never retried.
    Error { message: String },
}

/// Wire format of an inbound transcript message.
#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionMsg {
    pub text: String,
}

/// Wire format of an inbound error message.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorMsg {
    pub message: String,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to transcription service: {0}")]
    Connect(String),

    #[error("Failed to send segment: {0}")]
    Send(String),

    #[error("Transcription stream closed")]
    Closed,
}
