use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::audio::SegmentProcessor;
use crate::session::CaptureControl;
use voxavatar_audio::{CaptureThread, PcmRingBuffer, SpectrumAnalyzer};
use voxavatar_foundation::AudioError;
use voxavatar_telemetry::PipelineMetrics;
use voxavatar_transcribe::{AudioPayload, SegmentEncoder};
use voxavatar_vad::VadConfig;

/// Options for the capture-to-transcription pipeline.
#[derive(Clone, Debug, Default)]
pub struct PipelineOptions {
    /// Input device name; `None` selects the system default.
    pub device: Option<String>,
    pub vad: VadConfig,
}

struct RunningPipeline {
    capture: CaptureThread,
    processor_running: Arc<AtomicBool>,
    processor_handle: JoinHandle<()>,
}

/// Owns the voice-detection pipeline for one session at a time.
///
/// `start()` acquires the microphone and spawns the analysis loop;
/// `stop()` quiesces the source first and then the loop. Both are
/// idempotent, which lets the session tear down along any path.
pub struct PipelineControl {
    opts: PipelineOptions,
    payload_tx: mpsc::Sender<AudioPayload>,
    metrics: Arc<PipelineMetrics>,
    running: Option<RunningPipeline>,
}

impl PipelineControl {
    pub fn new(
        opts: PipelineOptions,
        payload_tx: mpsc::Sender<AudioPayload>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            opts,
            payload_tx,
            metrics,
            running: None,
        }
    }
}

impl CaptureControl for PipelineControl {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.running.is_some() {
            return Ok(());
        }

        let (producer, consumer) = PcmRingBuffer::new(16384 * 4).split();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        let (capture, recorder, device) = CaptureThread::spawn(
            self.opts.device.clone(),
            producer,
            error_tx,
            Some(self.metrics.clone()),
        )?;
        info!(
            "Voice detection started on '{}' ({} Hz)",
            device.name, device.sample_rate
        );

        let analyzer = SpectrumAnalyzer::new(consumer);
        let encoder = SegmentEncoder::new(self.payload_tx.clone(), self.metrics.clone());
        let processor_running = Arc::new(AtomicBool::new(true));
        let processor_handle = SegmentProcessor::spawn(
            analyzer,
            recorder,
            self.opts.vad,
            encoder,
            error_rx,
            self.metrics.clone(),
            processor_running.clone(),
        );

        self.running = Some(RunningPipeline {
            capture,
            processor_running,
            processor_handle,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.running.take() {
            // Quiesce the source before the consumer.
            pipeline.capture.stop();
            pipeline.processor_running.store(false, Ordering::SeqCst);
            pipeline.processor_handle.abort();
            info!("Voice detection stopped");
        }
    }
}
