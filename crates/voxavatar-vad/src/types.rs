/// One classified analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    /// Arithmetic mean of the frame's bin magnitudes, 0-255 scale.
    pub loudness: f32,
    /// Whether the frame clears the volume threshold.
    pub is_speech: bool,
}

/// Segmenter state, one of three.
///
/// A silence deadline is armed iff the state is `PendingSilence`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Idle,
    Speaking,
    PendingSilence,
}

/// Segment boundary decisions emitted by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentEvent {
    SegmentStarted {
        /// Milliseconds since the segmenter was created.
        timestamp_ms: u64,
        /// Loudness of the frame that opened the segment.
        loudness: f32,
    },
    SegmentEnded {
        timestamp_ms: u64,
        /// Wall time from segment start to confirmed end.
        duration_ms: u64,
    },
}
