pub mod capture;
pub mod recorder;
pub mod ring_buffer;
pub mod spectrum;

// Public API
pub use capture::{CaptureThread, DeviceInfo};
pub use recorder::{RecorderTap, SegmentRecorder};
pub use ring_buffer::PcmRingBuffer;
pub use spectrum::{SpectrumAnalyzer, SpectrumFrame, FFT_WINDOW_SAMPLES, SPECTRUM_BINS};
