use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use voxavatar_agent::{ConversationAgent, HttpAgentBackend, HttpAgentConfig};
use voxavatar_app::config::Cli;
use voxavatar_app::runtime::{PipelineControl, PipelineOptions};
use voxavatar_app::session::{ConversationOrchestrator, SessionConfig};
use voxavatar_avatar::{AvatarSessionConfig, RestAvatarClient, RestAvatarConfig, VoiceEmotion};
use voxavatar_foundation::ShutdownHandler;
use voxavatar_telemetry::PipelineMetrics;
use voxavatar_transcribe::{LinkConfig, TranscriptionLink};
use voxavatar_vad::VadConfig;

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "voxavatar.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging().map_err(|e| anyhow::anyhow!("logging setup failed: {}", e))?;
    tracing::info!("Starting VoxAvatar");

    let metrics = Arc::new(PipelineMetrics::default());

    // Transcription link: finalized segments out, transcripts in.
    let (payload_tx, payload_rx) = mpsc::channel(64);
    let (transcript_tx, transcript_rx) = mpsc::channel(64);
    let link_handle = TranscriptionLink::spawn(
        LinkConfig {
            url: cli.transcriber_url.clone(),
        },
        payload_rx,
        transcript_tx,
    );

    // Avatar and agent backends.
    let avatar = Arc::new(
        RestAvatarClient::connect(RestAvatarConfig {
            base_url: cli.avatar_api_url.clone(),
            api_key: cli.avatar_api_key.clone(),
        })
        .await?,
    );
    let agent = ConversationAgent::new(HttpAgentBackend::new(HttpAgentConfig {
        base_url: cli.agent_api_url.clone(),
        api_key: cli.agent_api_key.clone(),
        model: cli.agent_model.clone(),
    }));

    // Voice pipeline, started by the session once the stream is ready.
    let pipeline = PipelineControl::new(
        PipelineOptions {
            device: cli.device.clone(),
            vad: VadConfig::default(),
        },
        payload_tx,
        metrics.clone(),
    );

    let session_config = SessionConfig {
        avatar: AvatarSessionConfig {
            avatar_id: cli.avatar_id.clone(),
            voice_id: cli.voice_id.clone(),
            voice_rate: 1.0,
            emotion: VoiceEmotion::Excited,
            language: cli.language.clone(),
            ..Default::default()
        },
        instructions: cli.instructions()?,
        stream_ready_timeout: Duration::from_secs(30),
    };

    let mut orchestrator = ConversationOrchestrator::new(
        avatar,
        agent,
        pipeline,
        transcript_rx,
        session_config,
        metrics.clone(),
    );

    let shutdown = ShutdownHandler::new().install().await;

    orchestrator.start_session().await?;
    tracing::info!("Speak into the microphone; Ctrl-C ends the session");
    orchestrator.run(&shutdown).await?;

    link_handle.abort();
    let _ = link_handle.await;

    tracing::info!(
        "Session summary: {} segments sent ({} bytes), {} transcripts, {} turns",
        metrics.segments_sent.load(Ordering::Relaxed),
        metrics.bytes_sent.load(Ordering::Relaxed),
        metrics.transcripts_received.load(Ordering::Relaxed),
        metrics.turns_completed.load(Ordering::Relaxed),
    );
    tracing::info!("Shutdown complete");
    Ok(())
}
