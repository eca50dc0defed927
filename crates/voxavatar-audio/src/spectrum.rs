use std::sync::Arc;
use std::time::Instant;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::ring_buffer::PcmConsumer;

/// FFT window size; matches the original analyser resolution.
pub const FFT_WINDOW_SAMPLES: usize = 512;

/// Number of frequency bins exposed per frame.
pub const SPECTRUM_BINS: usize = FFT_WINDOW_SAMPLES / 2;

// Byte mapping range and time smoothing follow the Web Audio
// AnalyserNode convention for byte frequency data; the volume
// threshold is calibrated against this scale.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

/// One analysis frame: a byte magnitude per frequency bin.
///
/// Ephemeral — produced per tick, consumed by the classifier, never stored.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub bins: Vec<u8>,
    pub timestamp: Instant,
}

/// Converts the live capture stream into byte-magnitude frequency frames.
///
/// Keeps a rolling window of the most recent samples; each `sample()`
/// call drains whatever the capture callback produced since the last
/// tick, then computes magnitudes over the window: Hann window, forward
/// FFT, per-bin magnitude, exponential time smoothing, dB conversion,
/// and a linear [-100 dB, -30 dB] -> [0, 255] byte mapping.
pub struct SpectrumAnalyzer {
    consumer: PcmConsumer,
    window: Vec<i16>,
    hann: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(consumer: PcmConsumer) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(FFT_WINDOW_SAMPLES);
        let scratch_len = fft.get_inplace_scratch_len();

        let hann = (0..FFT_WINDOW_SAMPLES)
            .map(|i| {
                let phase =
                    2.0 * std::f32::consts::PI * i as f32 / (FFT_WINDOW_SAMPLES - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        Self {
            consumer,
            window: vec![0; FFT_WINDOW_SAMPLES],
            hann,
            fft,
            fft_buffer: vec![Complex::default(); FFT_WINDOW_SAMPLES],
            scratch: vec![Complex::default(); scratch_len],
            smoothed: vec![0.0; SPECTRUM_BINS],
        }
    }

    /// Produce the frame for this tick. Always returns a value: before
    /// any audio has arrived the window is zeros and every bin maps to 0.
    pub fn sample(&mut self) -> SpectrumFrame {
        self.drain_into_window();

        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let normalized = self.window[i] as f32 / 32768.0;
            *slot = Complex::new(normalized * self.hann[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        let mut bins = Vec::with_capacity(SPECTRUM_BINS);
        for (i, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[i].norm() / FFT_WINDOW_SAMPLES as f32;
            *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;

            let db = 20.0 * smoothed.log10();
            let byte = ((db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS) * 255.0)
                .clamp(0.0, 255.0) as u8;
            bins.push(byte);
        }

        SpectrumFrame {
            bins,
            timestamp: Instant::now(),
        }
    }

    fn drain_into_window(&mut self) {
        let mut buf = [0i16; FFT_WINDOW_SAMPLES];
        loop {
            let n = self.consumer.read(&mut buf);
            if n == 0 {
                break;
            }
            let wlen = self.window.len();
            if n >= wlen {
                self.window.copy_from_slice(&buf[n - wlen..n]);
            } else {
                self.window.copy_within(n.., 0);
                let tail = self.window.len() - n;
                self.window[tail..].copy_from_slice(&buf[..n]);
            }
        }
    }
}
