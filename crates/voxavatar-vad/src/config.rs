use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::constants::{SILENCE_DELAY_MS, VOLUME_THRESHOLD};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VadConfig {
    /// Classification threshold on the mean bin magnitude (0-255 scale).
    pub volume_threshold: f32,
    /// Silence debounce before a segment is finalized.
    pub silence_delay_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            volume_threshold: VOLUME_THRESHOLD,
            silence_delay_ms: SILENCE_DELAY_MS,
        }
    }
}

impl VadConfig {
    pub fn silence_delay(&self) -> Duration {
        Duration::from_millis(self.silence_delay_ms)
    }
}
