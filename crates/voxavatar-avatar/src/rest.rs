//! REST adapter for a hosted streaming-avatar service.
//!
//! Call flow mirrors the vendor API: a short-lived session token is
//! acquired with the account API key, sessions are created and driven
//! through JSON endpoints, and session events (stream ready / stream
//! disconnected) arrive over the realtime WebSocket returned at session
//! creation and are pumped into the client's broadcast feed.

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AvatarError;
use crate::types::{
    AvatarEvent, AvatarSessionConfig, MediaStreamHandle, SessionHandle, SpeakAck,
};
use crate::AvatarClient;

#[derive(Debug, Clone)]
pub struct RestAvatarConfig {
    pub base_url: String,
    pub api_key: String,
}

pub struct RestAvatarClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    events_tx: broadcast::Sender<AvatarEvent>,
    event_pump: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    session_id: String,
    #[serde(default)]
    realtime_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RealtimeEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    url: Option<String>,
}

impl RestAvatarClient {
    /// Exchange the account API key for a session token.
    pub async fn connect(config: RestAvatarConfig) -> Result<Self, AvatarError> {
        let http = reqwest::Client::new();
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let response = http
            .post(format!("{}/v1/streaming.create_token", base_url))
            .header("x-api-key", &config.api_key)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AvatarError::Token(e.to_string()))?;

        let envelope: DataEnvelope<TokenData> = response
            .json()
            .await
            .map_err(|e| AvatarError::Protocol(e.to_string()))?;

        let (events_tx, _) = broadcast::channel(32);
        info!("Avatar service token acquired");

        Ok(Self {
            http,
            base_url,
            token: envelope.data.token,
            events_tx,
            event_pump: Mutex::new(None),
        })
    }

    fn spawn_event_pump(&self, realtime_url: String) {
        let events_tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let ws = match connect_async(realtime_url.as_str()).await {
                Ok((ws, _)) => ws,
                Err(e) => {
                    error!("Failed to open avatar realtime stream: {}", e);
                    let _ = events_tx.send(AvatarEvent::StreamDisconnected);
                    return;
                }
            };
            let (_, mut stream) = ws.split();

            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        let event = match serde_json::from_str::<RealtimeEvent>(text.as_str()) {
                            Ok(ev) => ev,
                            Err(e) => {
                                debug!("Ignoring unparseable avatar event: {}", e);
                                continue;
                            }
                        };
                        match event.kind.as_str() {
                            "stream.ready" => {
                                let url = event.url.unwrap_or_default();
                                let _ = events_tx
                                    .send(AvatarEvent::StreamReady(MediaStreamHandle { url }));
                            }
                            "stream.disconnected" => {
                                let _ = events_tx.send(AvatarEvent::StreamDisconnected);
                                return;
                            }
                            other => debug!("Unhandled avatar event type: {}", other),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Avatar realtime stream error: {}", e);
                        break;
                    }
                }
            }
            // A dropped realtime stream means the session is gone.
            let _ = events_tx.send(AvatarEvent::StreamDisconnected);
        });

        if let Some(old) = self.event_pump.lock().replace(handle) {
            old.abort();
        }
    }
}

#[async_trait]
impl AvatarClient for RestAvatarClient {
    async fn create_session(
        &self,
        config: &AvatarSessionConfig,
    ) -> Result<SessionHandle, AvatarError> {
        let response = self
            .http
            .post(format!("{}/v1/streaming.new", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "avatar_name": config.avatar_id,
                "quality": config.quality,
                "voice": {
                    "voice_id": config.voice_id,
                    "rate": config.voice_rate,
                    "emotion": config.emotion,
                },
                "language": config.language,
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AvatarError::Session(e.to_string()))?;

        let envelope: DataEnvelope<SessionData> = response
            .json()
            .await
            .map_err(|e| AvatarError::Protocol(e.to_string()))?;
        let data = envelope.data;
        info!("Avatar session {} created", data.session_id);

        if let Some(url) = &data.realtime_url {
            self.spawn_event_pump(url.clone());
        }

        Ok(SessionHandle {
            session_id: data.session_id,
            realtime_url: data.realtime_url,
        })
    }

    async fn speak(&self, session: &SessionHandle, text: &str) -> Result<SpeakAck, AvatarError> {
        let response = self
            .http
            .post(format!("{}/v1/streaming.task", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "session_id": session.session_id,
                "text": text,
                "task_type": "repeat",
            }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AvatarError::Speak(e.to_string()))?;

        let envelope: DataEnvelope<TaskData> = response
            .json()
            .await
            .map_err(|e| AvatarError::Protocol(e.to_string()))?;

        Ok(SpeakAck {
            task_id: envelope.data.task_id,
            duration_ms: envelope.data.duration_ms,
        })
    }

    async fn stop(&self, session: &SessionHandle) -> Result<(), AvatarError> {
        if let Some(pump) = self.event_pump.lock().take() {
            pump.abort();
        }

        self.http
            .post(format!("{}/v1/streaming.stop", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({ "session_id": session.session_id }))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AvatarError::Session(e.to_string()))?;

        info!("Avatar session {} stopped", session.session_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AvatarEvent> {
        self.events_tx.subscribe()
    }
}
