use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared counters for cross-task pipeline monitoring.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Capture / analysis
    pub frames_captured: Arc<AtomicU64>,
    pub frames_analyzed: Arc<AtomicU64>,
    pub analysis_fps: Arc<AtomicU64>,    // FPS * 10
    pub current_loudness: Arc<AtomicU64>, // mean bin value * 10

    // Pipeline stage activity
    pub stage_capture: Arc<AtomicBool>,
    pub stage_analysis: Arc<AtomicBool>,
    pub stage_segmenter: Arc<AtomicBool>,
    pub stage_transmit: Arc<AtomicBool>,

    // Segmentation
    pub is_speaking: Arc<AtomicBool>,
    pub last_speech_time: Arc<RwLock<Option<Instant>>>,
    pub segments_started: Arc<AtomicU64>,
    pub segments_completed: Arc<AtomicU64>,

    // Transmission
    pub segments_sent: Arc<AtomicU64>,
    pub segments_discarded_empty: Arc<AtomicU64>,
    pub bytes_sent: Arc<AtomicU64>,
    pub transport_errors: Arc<AtomicU64>,

    // Conversation
    pub transcripts_received: Arc<AtomicU64>,
    pub transcripts_ignored: Arc<AtomicU64>,
    pub turns_completed: Arc<AtomicU64>,
    pub agent_fallbacks: Arc<AtomicU64>,

    // Errors
    pub capture_errors: Arc<AtomicU64>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            frames_captured: Arc::new(AtomicU64::new(0)),
            frames_analyzed: Arc::new(AtomicU64::new(0)),
            analysis_fps: Arc::new(AtomicU64::new(0)),
            current_loudness: Arc::new(AtomicU64::new(0)),

            stage_capture: Arc::new(AtomicBool::new(false)),
            stage_analysis: Arc::new(AtomicBool::new(false)),
            stage_segmenter: Arc::new(AtomicBool::new(false)),
            stage_transmit: Arc::new(AtomicBool::new(false)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            last_speech_time: Arc::new(RwLock::new(None)),
            segments_started: Arc::new(AtomicU64::new(0)),
            segments_completed: Arc::new(AtomicU64::new(0)),

            segments_sent: Arc::new(AtomicU64::new(0)),
            segments_discarded_empty: Arc::new(AtomicU64::new(0)),
            bytes_sent: Arc::new(AtomicU64::new(0)),
            transport_errors: Arc::new(AtomicU64::new(0)),

            transcripts_received: Arc::new(AtomicU64::new(0)),
            transcripts_ignored: Arc::new(AtomicU64::new(0)),
            turns_completed: Arc::new(AtomicU64::new(0)),
            agent_fallbacks: Arc::new(AtomicU64::new(0)),

            capture_errors: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl PipelineMetrics {
    pub fn update_loudness(&self, loudness: f32) {
        self.current_loudness
            .store((loudness.max(0.0) * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn loudness(&self) -> f32 {
        self.current_loudness.load(Ordering::Relaxed) as f32 / 10.0
    }

    pub fn mark_stage_active(&self, stage: PipelineStage) {
        match stage {
            PipelineStage::Capture => self.stage_capture.store(true, Ordering::Relaxed),
            PipelineStage::Analysis => self.stage_analysis.store(true, Ordering::Relaxed),
            PipelineStage::Segmenter => self.stage_segmenter.store(true, Ordering::Relaxed),
            PipelineStage::Transmit => self.stage_transmit.store(true, Ordering::Relaxed),
        }
    }

    pub fn decay_stages(&self) {
        self.stage_capture.store(false, Ordering::Relaxed);
        self.stage_analysis.store(false, Ordering::Relaxed);
        self.stage_segmenter.store(false, Ordering::Relaxed);
        self.stage_transmit.store(false, Ordering::Relaxed);
    }

    pub fn update_analysis_fps(&self, fps: f64) {
        self.analysis_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn mark_speech_active(&self) {
        self.is_speaking.store(true, Ordering::Relaxed);
        *self.last_speech_time.write() = Some(Instant::now());
        self.segments_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_speech_ended(&self) {
        self.is_speaking.store(false, Ordering::Relaxed);
        self.segments_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_segment_sent(&self, bytes: usize) {
        self.segments_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.mark_stage_active(PipelineStage::Transmit);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PipelineStage {
    Capture,
    Analysis,
    Segmenter,
    Transmit,
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
