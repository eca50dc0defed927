use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use voxavatar_audio::{SegmentRecorder, SpectrumAnalyzer};
use voxavatar_foundation::AudioError;
use voxavatar_telemetry::{FpsTracker, PipelineMetrics, PipelineStage};
use voxavatar_transcribe::SegmentEncoder;
use voxavatar_vad::{SegmentEvent, SegmentState, SpeechSegmenter, VadConfig, VolumeClassifier};

/// Analysis cadence. Roughly display-refresh rate, which is far finer
/// than the silence delay the segmenter debounces over.
pub const ANALYSIS_TICK_MS: u64 = 16;

/// The per-frame classification loop.
///
/// Each tick samples the analyzer, classifies the frame, and advances
/// the segmenter; the armed silence deadline is the loop's only other
/// wake-up source. Segment boundaries drive the recorder and encoder.
/// The loop reschedules unconditionally, including after capture
/// errors — a capture failure aborts the in-flight segment and forces
/// the segmenter back to `Idle` rather than stalling in `Speaking`.
pub struct SegmentProcessor {
    analyzer: SpectrumAnalyzer,
    recorder: SegmentRecorder,
    classifier: VolumeClassifier,
    segmenter: SpeechSegmenter,
    encoder: SegmentEncoder,
    error_rx: mpsc::UnboundedReceiver<AudioError>,
    metrics: Arc<PipelineMetrics>,
    running: Arc<AtomicBool>,
    fps_tracker: FpsTracker,
    frames_processed: u64,
}

impl SegmentProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        analyzer: SpectrumAnalyzer,
        recorder: SegmentRecorder,
        config: VadConfig,
        encoder: SegmentEncoder,
        error_rx: mpsc::UnboundedReceiver<AudioError>,
        metrics: Arc<PipelineMetrics>,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let processor = Self {
            analyzer,
            recorder,
            classifier: VolumeClassifier::new(&config),
            segmenter: SpeechSegmenter::new(&config),
            encoder,
            error_rx,
            metrics,
            running,
            fps_tracker: FpsTracker::new(),
            frames_processed: 0,
        };

        tokio::spawn(async move {
            processor.run().await;
        })
    }

    async fn run(mut self) {
        info!("Segment processor started");

        let mut tick = tokio::time::interval(Duration::from_millis(ANALYSIS_TICK_MS));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.running.load(Ordering::SeqCst) {
            let deadline = self.segmenter.silence_deadline();
            tokio::select! {
                _ = tick.tick() => {
                    self.on_tick().await;
                }
                _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                    if let Some(event) = self.segmenter.on_silence_deadline(Instant::now()) {
                        self.handle_event(event).await;
                    }
                }
                Some(err) = self.error_rx.recv() => {
                    self.on_capture_error(err);
                }
            }
        }

        info!(
            "Segment processor stopped. Frames processed: {}",
            self.frames_processed
        );
    }

    async fn on_tick(&mut self) {
        let frame = self.analyzer.sample();
        let reading = self.classifier.classify(&frame.bins);

        self.frames_processed += 1;
        self.metrics.frames_analyzed.fetch_add(1, Ordering::Relaxed);
        self.metrics.update_loudness(reading.loudness);
        self.metrics.mark_stage_active(PipelineStage::Analysis);
        if let Some(fps) = self.fps_tracker.tick() {
            self.metrics.update_analysis_fps(fps);
        }

        if let Some(event) = self.segmenter.on_reading(reading, frame.timestamp) {
            self.handle_event(event).await;
        }

        if self.frames_processed % 1000 == 0 {
            debug!(
                "Segment processor: {} frames, state {:?}, loudness {:.1}",
                self.frames_processed,
                self.segmenter.current_state(),
                reading.loudness
            );
        }
    }

    async fn handle_event(&mut self, event: SegmentEvent) {
        self.metrics.mark_stage_active(PipelineStage::Segmenter);
        match event {
            SegmentEvent::SegmentStarted {
                timestamp_ms,
                loudness,
            } => {
                info!(
                    "Segment started @{}ms (loudness {:.1})",
                    timestamp_ms, loudness
                );
                if let Err(e) = self.recorder.start() {
                    error!("Failed to start segment recording: {}", e);
                    self.metrics.capture_errors.fetch_add(1, Ordering::Relaxed);
                    self.segmenter.reset();
                    return;
                }
                self.metrics.mark_speech_active();
            }
            SegmentEvent::SegmentEnded {
                timestamp_ms,
                duration_ms,
            } => {
                let bytes = self.recorder.stop();
                info!(
                    "Segment ended @{}ms after {}ms ({} bytes)",
                    timestamp_ms,
                    duration_ms,
                    bytes.len()
                );
                self.metrics.mark_speech_ended();
                self.encoder.transmit(bytes).await;
            }
        }
    }

    fn on_capture_error(&mut self, err: AudioError) {
        error!("Capture error: {}", err);
        self.metrics.capture_errors.fetch_add(1, Ordering::Relaxed);

        // A broken recording must not leave the segmenter stuck in
        // Speaking; the partial segment is discarded, not transmitted.
        if self.segmenter.current_state() != SegmentState::Idle {
            let discarded = self.recorder.stop();
            warn!(
                "Aborting in-flight segment ({} bytes discarded)",
                discarded.len()
            );
            self.segmenter.reset();
            self.metrics.is_speaking.store(false, Ordering::Relaxed);
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
        }
        None => std::future::pending().await,
    }
}
