use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use voxavatar_agent::{AgentBackend, AgentError, ConversationAgent, FALLBACK_REPLY};
use voxavatar_avatar::{
    AvatarClient, AvatarEvent, AvatarSessionConfig, MediaStreamHandle, SessionHandle,
};
use voxavatar_foundation::{
    AppError, AudioError, SessionState, SessionStateManager, ShutdownGuard,
};
use voxavatar_telemetry::PipelineMetrics;
use voxavatar_transcribe::TranscriptEvent;

/// Control surface of the capture pipeline, as seen by the session.
///
/// The orchestrator starts voice detection once the avatar stream is
/// ready and stops it first during any teardown; it never touches the
/// audio path beyond that.
pub trait CaptureControl: Send {
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self);
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub avatar: AvatarSessionConfig,
    pub instructions: String,
    /// How long session start waits for the avatar's stream-ready event.
    pub stream_ready_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            avatar: AvatarSessionConfig::default(),
            instructions: String::new(),
            stream_ready_timeout: Duration::from_secs(30),
        }
    }
}

enum TurnOutcome {
    Completed(Result<(), AgentError>),
    Disconnected,
}

/// Drives one conversation session end to end.
///
/// Owns the avatar client, the agent, the capture control handle, the
/// video sink, and the session state machine; nothing session-scoped
/// lives outside this object. Turns are strictly serial: the next
/// transcript is not read until the current turn, including the
/// avatar's acknowledgment of the speak request, has finished.
pub struct ConversationOrchestrator<A: AvatarClient, B: AgentBackend, C: CaptureControl> {
    avatar: Arc<A>,
    agent: ConversationAgent<B>,
    capture: C,
    transcript_rx: mpsc::Receiver<TranscriptEvent>,
    events: broadcast::Receiver<AvatarEvent>,
    state: SessionStateManager,
    config: SessionConfig,
    metrics: Arc<PipelineMetrics>,
    session: Option<SessionHandle>,
    video_sink: Option<MediaStreamHandle>,
}

impl<A: AvatarClient, B: AgentBackend, C: CaptureControl> ConversationOrchestrator<A, B, C> {
    pub fn new(
        avatar: Arc<A>,
        agent: ConversationAgent<B>,
        capture: C,
        transcript_rx: mpsc::Receiver<TranscriptEvent>,
        config: SessionConfig,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let events = avatar.subscribe();
        Self {
            avatar,
            agent,
            capture,
            transcript_rx,
            events,
            state: SessionStateManager::new(),
            config,
            metrics,
            session: None,
            video_sink: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    pub fn video_sink(&self) -> Option<&MediaStreamHandle> {
        self.video_sink.as_ref()
    }

    pub fn session_handle(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Bring the session up: avatar session, agent context, stream
    /// ready, then voice capture. A failure anywhere lands the session
    /// in `Terminated` with all acquired resources released — surfaced
    /// to the caller, never retried.
    pub async fn start_session(&mut self) -> Result<(), AppError> {
        if !self.state.can_start() {
            return Err(AppError::Session(
                "A session is already starting or active".to_string(),
            ));
        }
        self.state.transition(SessionState::Starting)?;

        match self.try_start().await {
            Ok(()) => {
                self.state.transition(SessionState::Active)?;
                info!("Session active");
                Ok(())
            }
            Err(e) => {
                error!("Session start failed: {}", e);
                self.capture.stop();
                if let Some(session) = self.session.take() {
                    if let Err(stop_err) = self.avatar.stop(&session).await {
                        warn!("Avatar stop during failed start: {}", stop_err);
                    }
                }
                self.video_sink = None;
                self.state.transition(SessionState::Terminated)?;
                Err(e)
            }
        }
    }

    async fn try_start(&mut self) -> Result<(), AppError> {
        let session = self
            .avatar
            .create_session(&self.config.avatar)
            .await
            .map_err(|e| AppError::Session(format!("Avatar session creation failed: {}", e)))?;
        self.session = Some(session);

        self.agent
            .initialize(&self.config.instructions)
            .await
            .map_err(|e| AppError::Session(format!("Agent initialization failed: {}", e)))?;

        let stream = self.wait_for_stream_ready().await?;
        info!("Avatar stream ready: {}", stream.url);
        self.video_sink = Some(stream);

        // Voice detection starts only once the avatar can answer.
        self.capture.start()?;
        Ok(())
    }

    async fn wait_for_stream_ready(&mut self) -> Result<MediaStreamHandle, AppError> {
        let events = &mut self.events;
        tokio::time::timeout(self.config.stream_ready_timeout, async {
            loop {
                match events.recv().await {
                    Ok(AvatarEvent::StreamReady(stream)) => return Ok(stream),
                    Ok(AvatarEvent::StreamDisconnected) => {
                        return Err(AppError::Session(
                            "Avatar stream disconnected during start".to_string(),
                        ))
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Avatar event feed lagged by {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(AppError::Session("Avatar event feed closed".to_string()))
                    }
                }
            }
        })
        .await
        .map_err(|_| AppError::Session("Timed out waiting for avatar stream".to_string()))?
    }

    /// Serve the session until it terminates: serial conversation
    /// turns, avatar disconnect handling, and explicit shutdown.
    pub async fn run(&mut self, shutdown: &ShutdownGuard) -> Result<(), AppError> {
        while self.state.current() == SessionState::Active {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("Shutdown requested; terminating session");
                    self.terminate().await?;
                }
                event = self.events.recv() => {
                    match event {
                        Ok(AvatarEvent::StreamDisconnected)
                        | Err(broadcast::error::RecvError::Closed) => {
                            self.handle_disconnect()?;
                        }
                        Ok(AvatarEvent::StreamReady(_)) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Avatar event feed lagged by {} events", skipped);
                        }
                    }
                }
                maybe_event = self.transcript_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_transcript(event).await?,
                        None => {
                            warn!("Transcript channel closed; terminating session");
                            self.terminate().await?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_transcript(&mut self, event: TranscriptEvent) -> Result<(), AppError> {
        match event {
            TranscriptEvent::Error { message } => {
                // Logged, not retried; the segment is simply absent
                // from the conversation.
                error!("Transcription service error: {}", message);
                Ok(())
            }
            TranscriptEvent::Transcription { text } => {
                self.metrics
                    .transcripts_received
                    .fetch_add(1, Ordering::Relaxed);
                if text.trim().is_empty() {
                    debug!("Ignoring blank transcript");
                    self.metrics
                        .transcripts_ignored
                        .fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                self.run_turn(text).await
            }
        }
    }

    /// One conversation turn, raced against the avatar event feed: a
    /// disconnect mid-turn discards the turn (no further speak calls)
    /// and tears the session down.
    async fn run_turn(&mut self, text: String) -> Result<(), AppError> {
        let Some(session) = self.session.clone() else {
            return Ok(());
        };
        info!("Conversation turn: {:?}", text);

        let outcome = {
            let turn = Self::execute_turn(
                &mut self.agent,
                self.avatar.as_ref(),
                &session,
                &text,
                self.metrics.as_ref(),
            );
            tokio::pin!(turn);

            loop {
                tokio::select! {
                    result = &mut turn => break TurnOutcome::Completed(result),
                    event = self.events.recv() => {
                        match event {
                            Ok(AvatarEvent::StreamDisconnected)
                            | Err(broadcast::error::RecvError::Closed) => {
                                break TurnOutcome::Disconnected;
                            }
                            _ => {}
                        }
                    }
                }
            }
        };

        match outcome {
            TurnOutcome::Completed(Ok(())) => Ok(()),
            TurnOutcome::Completed(Err(e)) => Err(AppError::Fatal(format!(
                "Conversation contract violated: {}",
                e
            ))),
            TurnOutcome::Disconnected => {
                info!("Avatar stream disconnected mid-turn; discarding turn");
                self.handle_disconnect()
            }
        }
    }

    async fn execute_turn(
        agent: &mut ConversationAgent<B>,
        avatar: &A,
        session: &SessionHandle,
        text: &str,
        metrics: &PipelineMetrics,
    ) -> Result<(), AgentError> {
        let reply = agent.get_response(text).await?;
        if reply == FALLBACK_REPLY {
            metrics.agent_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Agent reply: {:?}", reply);

        match avatar.speak(session, &reply).await {
            Ok(ack) => {
                info!("Turn complete (task {:?})", ack.task_id);
                metrics.turns_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // The disconnect event is the authoritative teardown
                // signal; a failed speak request ends only this turn.
                warn!("Avatar speak failed: {}", e);
            }
        }
        Ok(())
    }

    /// Unsolicited disconnect: straight to `Terminated`, local
    /// resources released, any turn in progress already discarded.
    fn handle_disconnect(&mut self) -> Result<(), AppError> {
        info!("Avatar stream disconnected; terminating session");
        self.video_sink = None;
        self.capture.stop();
        self.session = None;
        self.state.transition(SessionState::Terminated)
    }

    /// Explicit termination: capture stops first, then the avatar
    /// session closes, then the state settles in `Terminated`.
    pub async fn terminate(&mut self) -> Result<(), AppError> {
        if self.state.current() != SessionState::Active {
            return Ok(());
        }
        self.state.transition(SessionState::Terminating)?;

        self.capture.stop();
        if let Some(session) = self.session.take() {
            if let Err(e) = self.avatar.stop(&session).await {
                warn!("Avatar stop failed: {}", e);
            }
        }
        self.video_sink = None;
        self.state.transition(SessionState::Terminated)
    }
}
