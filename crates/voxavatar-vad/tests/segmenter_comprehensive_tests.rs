//! Comprehensive segmentation tests
//!
//! Tests cover:
//! - Segment boundary scenarios (speech burst, alternating speech/silence)
//! - Debounce timing (deadline arming, cancellation, latency bounds)
//! - Event alternation under arbitrary classification sequences
//! - Classifier/segmenter interaction at the threshold

use std::time::{Duration, Instant};

use rand::{rngs::StdRng, Rng, SeedableRng};
use voxavatar_vad::{
    LoudnessReading, SegmentEvent, SegmentState, SpeechSegmenter, VadConfig, VolumeClassifier,
};

const TICK: Duration = Duration::from_millis(100);
const DELAY: Duration = Duration::from_millis(1500);

fn reading(loudness: f32) -> LoudnessReading {
    LoudnessReading {
        loudness,
        is_speech: loudness > 90.0,
    }
}

/// Drive a sequence of per-tick loudness values, delivering deadline
/// wake-ups at the exact armed instants, and collect emitted events.
fn drive(loudness_per_tick: &[f32], trailing_ticks: usize) -> Vec<(SegmentEvent, Duration)> {
    let t0 = Instant::now();
    let mut seg = SpeechSegmenter::with_origin(&VadConfig::default(), t0);
    let mut events = Vec::new();
    let total = loudness_per_tick.len() + trailing_ticks;

    for i in 0..total {
        let now = t0 + TICK * i as u32;

        // A deadline that expires before this tick fires first.
        if let Some(deadline) = seg.silence_deadline() {
            if deadline <= now {
                if let Some(ev) = seg.on_silence_deadline(deadline) {
                    events.push((ev, deadline - t0));
                }
            }
        }

        let value = loudness_per_tick.get(i).copied().unwrap_or(40.0);
        if let Some(ev) = seg.on_reading(reading(value), now) {
            events.push((ev, now - t0));
        }
    }

    // Deliver any deadline still armed after the last tick.
    if let Some(deadline) = seg.silence_deadline() {
        if let Some(ev) = seg.on_silence_deadline(deadline) {
            events.push((ev, deadline - t0));
        }
    }

    events
}

// ─── Scenario Tests ──────────────────────────────────────────────────

#[test]
fn speech_burst_produces_one_segment() {
    // Frames [40, 40, 120, 130, 40] at 100ms spacing: the segment opens
    // on the first loud frame (tick 2, zero-based) and closes 1500ms
    // after the silence at tick 4.
    let events = drive(&[40.0, 40.0, 120.0, 130.0, 40.0], 20);

    assert_eq!(events.len(), 2, "events: {:?}", events);
    match events[0] {
        (SegmentEvent::SegmentStarted { loudness, .. }, at) => {
            assert_eq!(at, TICK * 2);
            assert_eq!(loudness, 120.0);
        }
        ref other => panic!("expected SegmentStarted first, got {:?}", other),
    }
    match events[1] {
        (SegmentEvent::SegmentEnded { .. }, at) => {
            assert_eq!(at, TICK * 4 + DELAY);
        }
        ref other => panic!("expected SegmentEnded second, got {:?}", other),
    }
}

#[test]
fn alternating_speech_and_silence_stays_one_segment() {
    // [100, 40, 100, 40, ...] with every gap far below the 1500ms delay:
    // the countdown is reset by each loud frame, so the segment never
    // closes while the alternation lasts.
    let pattern: Vec<f32> = (0..40).map(|i| if i % 2 == 0 { 100.0 } else { 40.0 }).collect();
    let events = drive(&pattern, 20);

    let starts = events
        .iter()
        .filter(|(e, _)| matches!(e, SegmentEvent::SegmentStarted { .. }))
        .count();
    let ends = events
        .iter()
        .filter(|(e, _)| matches!(e, SegmentEvent::SegmentEnded { .. }))
        .count();
    assert_eq!(starts, 1, "alternation must not fragment the segment");
    assert_eq!(ends, 1, "the single segment closes once silence persists");

    // The close happens only after the trailing silence, i.e. at the
    // last loud frame's silence successor + delay.
    let (_, end_at) = events
        .iter()
        .find(|(e, _)| matches!(e, SegmentEvent::SegmentEnded { .. }))
        .unwrap();
    assert_eq!(*end_at, TICK * 39 + DELAY);
}

#[test]
fn two_bursts_separated_by_long_silence_are_two_segments() {
    let mut pattern = vec![120.0; 5];
    pattern.extend(vec![40.0; 20]); // 2000ms of silence > delay
    pattern.extend(vec![120.0; 5]);
    let events = drive(&pattern, 20);

    let kinds: Vec<bool> = events
        .iter()
        .map(|(e, _)| matches!(e, SegmentEvent::SegmentStarted { .. }))
        .collect();
    assert_eq!(kinds, vec![true, false, true, false]);
}

// ─── Timing Bounds ───────────────────────────────────────────────────

#[test]
fn segment_end_is_never_early() {
    let t0 = Instant::now();
    let mut seg = SpeechSegmenter::with_origin(&VadConfig::default(), t0);
    seg.on_reading(reading(120.0), t0);
    let last_speech = t0 + TICK;
    seg.on_reading(reading(120.0), last_speech);
    seg.on_reading(reading(40.0), last_speech + TICK);

    // Any wake-up strictly before silence onset + delay must not close.
    let silence_onset = last_speech + TICK;
    for ms in [0u64, 100, 500, 1000, 1400, 1499] {
        assert_eq!(
            seg.on_silence_deadline(silence_onset + Duration::from_millis(ms)),
            None,
            "closed {}ms after silence onset",
            ms
        );
    }

    // At the armed deadline it closes.
    let ev = seg.on_silence_deadline(last_speech + TICK + DELAY);
    assert!(matches!(ev, Some(SegmentEvent::SegmentEnded { .. })));
}

#[test]
fn sub_delay_speech_gaps_never_finalize() {
    // Inject speech frames at arbitrary intervals below the delay; no
    // SegmentEnded may ever be produced.
    let mut rng = StdRng::seed_from_u64(7);
    let t0 = Instant::now();
    let mut seg = SpeechSegmenter::with_origin(&VadConfig::default(), t0);
    let mut now = t0;

    seg.on_reading(reading(120.0), now);
    for _ in 0..200 {
        // Silence for under the delay, then speech again.
        let gap = Duration::from_millis(rng.gen_range(1..1500));
        seg.on_reading(reading(40.0), now + Duration::from_millis(1));

        // The pending deadline may be polled at any point before expiry.
        if let Some(deadline) = seg.silence_deadline() {
            assert_eq!(seg.on_silence_deadline(deadline - Duration::from_millis(1)), None);
        }

        now += gap;
        let ev = seg.on_reading(reading(120.0), now);
        assert!(
            !matches!(ev, Some(SegmentEvent::SegmentEnded { .. })),
            "speech gap below the delay must not close the segment"
        );
        assert_ne!(seg.current_state(), SegmentState::Idle);
    }
}

// ─── Alternation Property ────────────────────────────────────────────

#[test]
fn events_strictly_alternate_under_random_input() {
    let mut rng = StdRng::seed_from_u64(42);

    for trial in 0..50 {
        let len = rng.gen_range(10..200);
        let pattern: Vec<f32> = (0..len)
            .map(|_| if rng.gen_bool(0.5) { 120.0 } else { 40.0 })
            .collect();
        let events = drive(&pattern, 20);

        let mut open = false;
        for (ev, at) in &events {
            match ev {
                SegmentEvent::SegmentStarted { .. } => {
                    assert!(
                        !open,
                        "trial {}: SegmentStarted at {:?} while a segment was open",
                        trial, at
                    );
                    open = true;
                }
                SegmentEvent::SegmentEnded { .. } => {
                    assert!(
                        open,
                        "trial {}: SegmentEnded at {:?} without a matching start",
                        trial, at
                    );
                    open = false;
                }
            }
        }
        // The driver delivers the final pending deadline, so every run
        // ends with all segments closed.
        assert!(!open, "trial {}: segment left open", trial);
    }
}

// ─── Classifier Integration ──────────────────────────────────────────

#[test]
fn classifier_feeds_segmenter_at_threshold_boundary() {
    let config = VadConfig::default();
    let classifier = VolumeClassifier::new(&config);
    let t0 = Instant::now();
    let mut seg = SpeechSegmenter::with_origin(&config, t0);

    // Mean exactly 90 is silence; nothing opens.
    let at_threshold = classifier.classify(&[90u8; 256]);
    assert_eq!(seg.on_reading(at_threshold, t0), None);
    assert_eq!(seg.current_state(), SegmentState::Idle);

    // Mean 91 is speech; the segment opens.
    let above = classifier.classify(&[91u8; 256]);
    let ev = seg.on_reading(above, t0 + TICK);
    assert!(matches!(ev, Some(SegmentEvent::SegmentStarted { .. })));
}
