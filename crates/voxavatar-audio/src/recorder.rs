use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use voxavatar_foundation::AudioError;

/// Capture-side tap feeding the recorder.
///
/// The capture callback pushes every sample batch through here; bytes
/// are kept only while a segment is being recorded.
#[derive(Default)]
pub struct RecorderTap {
    armed: AtomicBool,
    buffer: Mutex<Vec<u8>>,
}

impl RecorderTap {
    /// Append little-endian i16 PCM bytes when armed. Called from the
    /// audio callback for every batch, armed or not.
    pub fn push_samples(&self, samples: &[i16]) {
        if !self.armed.load(Ordering::Relaxed) {
            return;
        }
        let mut buffer = self.buffer.lock();
        buffer.reserve(samples.len() * 2);
        for &sample in samples {
            buffer.extend_from_slice(&sample.to_le_bytes());
        }
    }
}

/// Start/stop handle for capturing the raw bytes of one speech segment.
///
/// Recording is controlled independently of frame sampling but taps the
/// same capture stream. The segmenter only starts and stops recording;
/// it never reads raw bytes directly.
pub struct SegmentRecorder {
    tap: Arc<RecorderTap>,
    capture_running: Arc<AtomicBool>,
}

impl SegmentRecorder {
    pub fn new(tap: Arc<RecorderTap>, capture_running: Arc<AtomicBool>) -> Self {
        Self {
            tap,
            capture_running,
        }
    }

    /// Begin recording a new segment. Any bytes from a previous segment
    /// are discarded. Fails when the capture stream is no longer live.
    pub fn start(&self) -> Result<(), AudioError> {
        if !self.capture_running.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceDisconnected);
        }
        self.tap.buffer.lock().clear();
        self.tap.armed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop recording and take ownership of the captured bytes.
    pub fn stop(&self) -> Vec<u8> {
        self.tap.armed.store(false, Ordering::SeqCst);
        std::mem::take(&mut *self.tap.buffer.lock())
    }

    pub fn is_recording(&self) -> bool {
        self.tap.armed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (SegmentRecorder, Arc<RecorderTap>, Arc<AtomicBool>) {
        let tap = Arc::new(RecorderTap::default());
        let running = Arc::new(AtomicBool::new(true));
        (
            SegmentRecorder::new(tap.clone(), running.clone()),
            tap,
            running,
        )
    }

    #[test]
    fn bytes_are_captured_only_while_armed() {
        let (rec, tap, _running) = recorder();

        tap.push_samples(&[1, 2]); // not armed yet
        rec.start().unwrap();
        tap.push_samples(&[0x0102, -1]);
        let bytes = rec.stop();
        tap.push_samples(&[3, 4]); // after stop

        assert_eq!(bytes, vec![0x02, 0x01, 0xFF, 0xFF]);
        assert!(rec.stop().is_empty());
    }

    #[test]
    fn start_clears_previous_segment() {
        let (rec, tap, _running) = recorder();

        rec.start().unwrap();
        tap.push_samples(&[7; 4]);
        let _ = rec.stop();

        rec.start().unwrap();
        tap.push_samples(&[1]);
        assert_eq!(rec.stop().len(), 2);
    }

    #[test]
    fn start_fails_once_capture_stopped() {
        let (rec, _tap, running) = recorder();
        running.store(false, Ordering::SeqCst);
        assert!(matches!(rec.start(), Err(AudioError::DeviceDisconnected)));
    }
}
