use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::types::{AudioPayload, ErrorMsg, TranscriptEvent, TranscriptionMsg, TransportError};

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// WebSocket endpoint of the transcription service.
    pub url: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:5000".to_string(),
        }
    }
}

/// Owns the WebSocket connection to the transcription service.
///
/// Outbound: each finalized segment goes out as one binary frame, no
/// acknowledgment awaited. Inbound: text frames are parsed into
/// transcript or error events and forwarded to the orchestrator. There
/// are no automatic retries anywhere: if the connection dies the link
/// logs it and keeps draining (and dropping) payloads so the
/// segmentation pipeline upstream is unaffected.
pub struct TranscriptionLink {
    config: LinkConfig,
    payload_rx: mpsc::Receiver<AudioPayload>,
    transcript_tx: mpsc::Sender<TranscriptEvent>,
}

impl TranscriptionLink {
    pub fn spawn(
        config: LinkConfig,
        payload_rx: mpsc::Receiver<AudioPayload>,
        transcript_tx: mpsc::Sender<TranscriptEvent>,
    ) -> JoinHandle<()> {
        let link = Self {
            config,
            payload_rx,
            transcript_tx,
        };
        tokio::spawn(async move {
            link.run().await;
        })
    }

    async fn run(mut self) {
        let ws = match connect_async(self.config.url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                error!(
                    "{} ({})",
                    TransportError::Connect(e.to_string()),
                    self.config.url
                );
                self.drain_disconnected().await;
                return;
            }
        };
        info!("Transcription link connected to {}", self.config.url);

        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                maybe_payload = self.payload_rx.recv() => {
                    match maybe_payload {
                        Some(payload) => {
                            let id = payload.segment_id;
                            let len = payload.bytes.len();
                            if let Err(e) = sink.send(Message::Binary(payload.bytes.into())).await {
                                warn!(
                                    "Segment {}: {}",
                                    id,
                                    TransportError::Send(e.to_string())
                                );
                            } else {
                                debug!("Segment {} sent ({} bytes)", id, len);
                            }
                        }
                        None => {
                            // Pipeline shut down; close politely.
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
                maybe_msg = stream.next() => {
                    match maybe_msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(text.as_str()).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!("Transcription stream closed by remote");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Transcription stream error: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        self.drain_disconnected().await;
    }

    async fn handle_text(&self, raw: &str) {
        if let Ok(msg) = serde_json::from_str::<TranscriptionMsg>(raw) {
            debug!("Transcript received: {:?}", msg.text);
            let _ = self
                .transcript_tx
                .send(TranscriptEvent::Transcription { text: msg.text })
                .await;
            return;
        }
        if let Ok(msg) = serde_json::from_str::<ErrorMsg>(raw) {
            error!("Transcription service error: {}", msg.message);
            let _ = self
                .transcript_tx
                .send(TranscriptEvent::Error {
                    message: msg.message,
                })
                .await;
            return;
        }
        warn!("Unrecognized transcription message: {}", raw);
    }

    /// With the connection gone, keep the upstream channel flowing so a
    /// lost link never backs up into the segmenter. Payloads are dropped
    /// with a log line; they are simply absent from the conversation.
    async fn drain_disconnected(&mut self) {
        while let Some(payload) = self.payload_rx.recv().await {
            warn!(
                "Transcription link down; dropping segment {} ({} bytes)",
                payload.segment_id,
                payload.bytes.len()
            );
        }
    }
}
