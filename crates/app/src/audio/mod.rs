pub mod segment_processor;

pub use segment_processor::{SegmentProcessor, ANALYSIS_TICK_MS};
