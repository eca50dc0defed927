//! Headless pipeline test: synthetic PCM through analysis,
//! classification, segmentation, recording, and encoding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc;

use voxavatar_app::audio::SegmentProcessor;
use voxavatar_audio::{PcmRingBuffer, RecorderTap, SegmentRecorder, SpectrumAnalyzer};
use voxavatar_telemetry::PipelineMetrics;
use voxavatar_transcribe::SegmentEncoder;
use voxavatar_vad::VadConfig;

/// Full-scale white noise reads as loud across the whole spectrum,
/// which is what pushes the mean bin magnitude over the threshold.
fn noise_chunk(rng: &mut StdRng, len: usize) -> Vec<i16> {
    (0..len).map(|_| rng.gen_range(-28000i16..28000)).collect()
}

#[tokio::test]
async fn spoken_burst_becomes_exactly_one_payload() {
    let (mut producer, consumer) = PcmRingBuffer::new(1 << 16).split();
    let tap = Arc::new(RecorderTap::default());
    let capture_running = Arc::new(AtomicBool::new(true));
    let recorder = SegmentRecorder::new(tap.clone(), capture_running.clone());
    let analyzer = SpectrumAnalyzer::new(consumer);

    let metrics = Arc::new(PipelineMetrics::default());
    let (payload_tx, mut payload_rx) = mpsc::channel(8);
    let encoder = SegmentEncoder::new(payload_tx, metrics.clone());
    let (_error_tx, error_rx) = mpsc::unbounded_channel();

    // Short silence delay keeps the test quick; the ratio between the
    // tick (16ms) and the delay mirrors production.
    let config = VadConfig {
        silence_delay_ms: 150,
        ..Default::default()
    };

    let running = Arc::new(AtomicBool::new(true));
    let handle = SegmentProcessor::spawn(
        analyzer,
        recorder,
        config,
        encoder,
        error_rx,
        metrics.clone(),
        running.clone(),
    );

    // Mimic the capture callback: every batch goes to both the analysis
    // ring and the recorder tap.
    let feeder = tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(99);
        // ~400ms of loud noise...
        for _ in 0..25 {
            let chunk = noise_chunk(&mut rng, 256);
            producer.write(&chunk);
            tap.push_samples(&chunk);
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        // ...then sustained silence until the segment must have closed.
        for _ in 0..150 {
            let chunk = vec![0i16; 256];
            producer.write(&chunk);
            tap.push_samples(&chunk);
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    });

    let payload = tokio::time::timeout(Duration::from_secs(10), payload_rx.recv())
        .await
        .expect("no segment finalized")
        .expect("payload channel closed");

    assert!(
        !payload.bytes.is_empty(),
        "finalized segment must carry audio"
    );
    assert_eq!(payload.bytes.len() % 2, 0, "payload is whole i16 samples");
    assert_eq!(metrics.segments_started.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.segments_completed.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.segments_sent.load(Ordering::Relaxed), 1);

    // Continued silence produces no further segments.
    assert!(
        tokio::time::timeout(Duration::from_millis(500), payload_rx.recv())
            .await
            .is_err(),
        "silence must not produce another payload"
    );

    running.store(false, Ordering::SeqCst);
    handle.abort();
    let _ = feeder.await;
}
