//! Segment transmission layer for VoxAvatar
//!
//! Finalized speech segments become one binary payload each and travel
//! to the external transcription service over a WebSocket link; the
//! service answers with transcript messages consumed by the
//! conversation orchestrator. The service itself is opaque.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod encoder;
pub mod link;
pub mod types;

pub use encoder::SegmentEncoder;
pub use link::{LinkConfig, TranscriptionLink};
pub use types::{AudioPayload, TranscriptEvent, TransportError};

/// Generates process-unique segment IDs
static SEGMENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique segment ID
pub fn next_segment_id() -> u64 {
    SEGMENT_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
