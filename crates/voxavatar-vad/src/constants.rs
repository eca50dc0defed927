//! Tuning constants for the volume-threshold VAD

/// Mean bin magnitude (0-255 scale) above which a frame counts as speech.
/// Chosen empirically; there is no per-session calibration.
pub const VOLUME_THRESHOLD: f32 = 90.0;

/// Silence duration required before a segment is finalized (ms).
/// Long enough to absorb breaths and short hesitations within one
/// utterance, short enough to bound end-of-utterance latency.
pub const SILENCE_DELAY_MS: u64 = 1500;
