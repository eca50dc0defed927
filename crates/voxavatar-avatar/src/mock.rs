//! Scriptable avatar client for tests and wiring checks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::AvatarError;
use crate::types::{
    AvatarEvent, AvatarSessionConfig, MediaStreamHandle, SessionHandle, SpeakAck,
};
use crate::AvatarClient;

pub struct MockAvatarClient {
    events_tx: broadcast::Sender<AvatarEvent>,
    speak_calls: Arc<Mutex<Vec<String>>>,
    stop_calls: Arc<AtomicUsize>,
    sessions_created: Arc<AtomicUsize>,
    fail_speak: Arc<AtomicBool>,
    speak_delay: Option<Duration>,
    /// Emit `StreamReady` as soon as a session is created.
    auto_ready: bool,
}

impl Default for MockAvatarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAvatarClient {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            events_tx,
            speak_calls: Arc::new(Mutex::new(Vec::new())),
            stop_calls: Arc::new(AtomicUsize::new(0)),
            sessions_created: Arc::new(AtomicUsize::new(0)),
            fail_speak: Arc::new(AtomicBool::new(false)),
            speak_delay: None,
            auto_ready: true,
        }
    }

    pub fn without_auto_ready(mut self) -> Self {
        self.auto_ready = false;
        self
    }

    pub fn with_speak_delay(mut self, delay: Duration) -> Self {
        self.speak_delay = Some(delay);
        self
    }

    pub fn set_fail_speak(&self, fail: bool) {
        self.fail_speak.store(fail, Ordering::SeqCst);
    }

    /// Inject an event as if the service had emitted it.
    pub fn emit(&self, event: AvatarEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn speak_calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.speak_calls.clone()
    }

    pub fn stop_calls(&self) -> Arc<AtomicUsize> {
        self.stop_calls.clone()
    }

    pub fn sessions_created(&self) -> Arc<AtomicUsize> {
        self.sessions_created.clone()
    }
}

#[async_trait]
impl AvatarClient for MockAvatarClient {
    async fn create_session(
        &self,
        _config: &AvatarSessionConfig,
    ) -> Result<SessionHandle, AvatarError> {
        let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        if self.auto_ready {
            let _ = self.events_tx.send(AvatarEvent::StreamReady(MediaStreamHandle {
                url: "mock://stream".to_string(),
            }));
        }
        Ok(SessionHandle {
            session_id: format!("mock-session-{}", n),
            realtime_url: None,
        })
    }

    async fn speak(&self, _session: &SessionHandle, text: &str) -> Result<SpeakAck, AvatarError> {
        if let Some(delay) = self.speak_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_speak.load(Ordering::SeqCst) {
            return Err(AvatarError::Speak("mock speak failure".to_string()));
        }
        self.speak_calls.lock().push(text.to_string());
        Ok(SpeakAck::default())
    }

    async fn stop(&self, _session: &SessionHandle) -> Result<(), AvatarError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AvatarEvent> {
        self.events_tx.subscribe()
    }
}
