use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::AudioPayload;
use crate::next_segment_id;
use voxavatar_telemetry::PipelineMetrics;

/// Packages one finished segment's bytes and hands them to the outbound
/// channel, exactly once per segment boundary.
///
/// Empty segments are discarded rather than sent. The send is
/// fire-and-forget: no backend acknowledgment is awaited, so the next
/// segment may begin recording immediately. A dead channel is a logged
/// transport error, never a pipeline failure.
pub struct SegmentEncoder {
    outbound: mpsc::Sender<AudioPayload>,
    metrics: Arc<PipelineMetrics>,
}

impl SegmentEncoder {
    pub fn new(outbound: mpsc::Sender<AudioPayload>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { outbound, metrics }
    }

    pub async fn transmit(&self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            debug!("Discarding empty segment");
            self.metrics
                .segments_discarded_empty
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return;
        }

        let payload = AudioPayload {
            segment_id: next_segment_id(),
            bytes,
        };
        let len = payload.bytes.len();
        let id = payload.segment_id;

        match self.outbound.send(payload).await {
            Ok(()) => {
                info!("Segment {} queued for transcription ({} bytes)", id, len);
                self.metrics.record_segment_sent(len);
            }
            Err(_) => {
                warn!("Transcription channel closed; segment {} lost", id);
                self.metrics
                    .transport_errors
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }
}
