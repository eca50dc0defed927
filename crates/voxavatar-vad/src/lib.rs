pub mod classifier;
pub mod config;
pub mod constants;
pub mod segmenter;
pub mod types;

// Core exports - grouped and sorted alphabetically
pub use classifier::VolumeClassifier;
pub use config::VadConfig;
pub use constants::{SILENCE_DELAY_MS, VOLUME_THRESHOLD};
pub use segmenter::SpeechSegmenter;
pub use types::{LoudnessReading, SegmentEvent, SegmentState};
