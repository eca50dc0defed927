use crate::config::VadConfig;
use crate::types::{LoudnessReading, SegmentEvent, SegmentState};
use std::time::{Duration, Instant};

/// Debouncing speech segmenter.
///
/// Consumes one loudness reading per analysis tick and decides where
/// utterance boundaries fall. A segment opens on the first speech frame
/// and closes only after `silence_delay` of uninterrupted silence, so
/// breaths and short hesitations do not split one utterance. The last
/// classification before the delay expires governs: any speech frame,
/// however brief, fully resets the countdown.
///
/// The silence deadline is a single owned `Option<Instant>`; arming
/// replaces any previous value and cancelling clears it. It is `Some`
/// iff the state is `PendingSilence`, which is what makes a stale
/// wake-up after the state has moved on a provable no-op. The segmenter
/// performs no I/O and never fails; callers act on the returned events.
pub struct SpeechSegmenter {
    state: SegmentState,

    silence_deadline: Option<Instant>,

    silence_delay: Duration,

    speech_started_at: Option<Instant>,

    created_at: Instant,
}

impl SpeechSegmenter {
    pub fn new(config: &VadConfig) -> Self {
        Self::with_origin(config, Instant::now())
    }

    /// Construct with an explicit time origin for event timestamps.
    pub fn with_origin(config: &VadConfig, origin: Instant) -> Self {
        Self {
            state: SegmentState::Idle,
            silence_deadline: None,
            silence_delay: config.silence_delay(),
            speech_started_at: None,
            created_at: origin,
        }
    }

    /// Advance the state machine by one classified frame.
    pub fn on_reading(&mut self, reading: LoudnessReading, now: Instant) -> Option<SegmentEvent> {
        if reading.is_speech {
            match self.state {
                SegmentState::Idle => {
                    self.state = SegmentState::Speaking;
                    self.speech_started_at = Some(now);
                    Some(SegmentEvent::SegmentStarted {
                        timestamp_ms: self.timestamp_ms(now),
                        loudness: reading.loudness,
                    })
                }
                SegmentState::Speaking => None,
                SegmentState::PendingSilence => {
                    // Debounce reset: cancel the pending deadline and
                    // return to plain Speaking.
                    self.silence_deadline = None;
                    self.state = SegmentState::Speaking;
                    None
                }
            }
        } else {
            match self.state {
                SegmentState::Idle => None,
                SegmentState::Speaking => {
                    self.silence_deadline = Some(now + self.silence_delay);
                    self.state = SegmentState::PendingSilence;
                    None
                }
                // A deadline is already armed; never arm a second one.
                SegmentState::PendingSilence => None,
            }
        }
    }

    /// The armed silence deadline, if any. `Some` iff state is `PendingSilence`.
    pub fn silence_deadline(&self) -> Option<Instant> {
        self.silence_deadline
    }

    /// Deliver a deadline wake-up.
    ///
    /// Finalizes the segment only when the state is still `PendingSilence`
    /// and the armed deadline has genuinely elapsed; a wake-up that raced
    /// with a cancellation does nothing.
    pub fn on_silence_deadline(&mut self, now: Instant) -> Option<SegmentEvent> {
        if self.state != SegmentState::PendingSilence {
            return None;
        }
        let deadline = self.silence_deadline?;
        if now < deadline {
            return None;
        }

        self.state = SegmentState::Idle;
        self.silence_deadline = None;

        let duration_ms = self
            .speech_started_at
            .take()
            .map(|start| now.duration_since(start).as_millis() as u64)
            .unwrap_or(0)
            .max(1);

        Some(SegmentEvent::SegmentEnded {
            timestamp_ms: self.timestamp_ms(now),
            duration_ms,
        })
    }

    /// Force the segmenter back to `Idle` without emitting an event.
    ///
    /// Used when the recording side fails mid-segment: the aborted
    /// segment is discarded by the caller and must not produce a
    /// `SegmentEnded`, which would otherwise trigger a transmit.
    pub fn reset(&mut self) {
        self.state = SegmentState::Idle;
        self.silence_deadline = None;
        self.speech_started_at = None;
    }

    pub fn current_state(&self) -> SegmentState {
        self.state
    }

    fn timestamp_ms(&self, now: Instant) -> u64 {
        now.duration_since(self.created_at).as_millis() as u64
    }
}
