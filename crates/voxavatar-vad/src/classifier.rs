use crate::config::VadConfig;
use crate::types::LoudnessReading;

/// Stateless loudness classifier over byte-magnitude frequency frames.
///
/// Loudness is the arithmetic mean of all bin magnitudes; a frame is
/// speech when that mean is strictly above the configured threshold.
/// Always returns a reading, even for an empty frame.
#[derive(Debug, Clone, Copy)]
pub struct VolumeClassifier {
    threshold: f32,
}

impl VolumeClassifier {
    pub fn new(config: &VadConfig) -> Self {
        Self {
            threshold: config.volume_threshold,
        }
    }

    pub fn classify(&self, bins: &[u8]) -> LoudnessReading {
        let loudness = if bins.is_empty() {
            0.0
        } else {
            let sum: u64 = bins.iter().map(|&b| b as u64).sum();
            sum as f32 / bins.len() as f32
        };

        LoudnessReading {
            loudness,
            is_speech: loudness > self.threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
