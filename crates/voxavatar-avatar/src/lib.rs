//! Streaming avatar abstraction for VoxAvatar
//!
//! The rendering/video service is an external collaborator: it takes
//! text and produces an animated video stream. This crate defines the
//! client contract plus two implementations: a REST adapter for a
//! hosted streaming-avatar service and a scriptable mock.

pub mod error;
pub mod mock;
pub mod rest;
pub mod types;

pub use error::AvatarError;
pub use mock::MockAvatarClient;
pub use rest::{RestAvatarClient, RestAvatarConfig};
pub use types::{
    AvatarEvent, AvatarQuality, AvatarSessionConfig, MediaStreamHandle, SessionHandle, SpeakAck,
    VoiceEmotion,
};

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Client contract for a streaming avatar service.
///
/// Implementations emit [`AvatarEvent`]s on the broadcast feed:
/// `StreamReady` once the video stream can be attached, and
/// `StreamDisconnected` when the service drops the session.
#[async_trait]
pub trait AvatarClient: Send + Sync {
    async fn create_session(
        &self,
        config: &AvatarSessionConfig,
    ) -> Result<SessionHandle, AvatarError>;

    async fn speak(&self, session: &SessionHandle, text: &str) -> Result<SpeakAck, AvatarError>;

    async fn stop(&self, session: &SessionHandle) -> Result<(), AvatarError>;

    fn subscribe(&self) -> broadcast::Receiver<AvatarEvent>;
}
