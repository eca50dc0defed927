use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of one avatar conversation session.
///
/// `Starting` and `Active` block a new start request; re-entry into
/// `Starting` from `Terminated` begins a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Active,
    Terminating,
    Terminated,
}

pub struct SessionStateManager {
    state: Arc<RwLock<SessionState>>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionStateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(SessionState::Uninitialized)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), AppError> {
        let mut current = self.state.write();

        let valid = matches!(
            (*current, new_state),
            (SessionState::Uninitialized, SessionState::Starting)
                | (SessionState::Starting, SessionState::Active)
                | (SessionState::Starting, SessionState::Terminated)
                | (SessionState::Active, SessionState::Terminating)
                | (SessionState::Active, SessionState::Terminated)
                | (SessionState::Terminating, SessionState::Terminated)
                | (SessionState::Terminated, SessionState::Starting)
        );

        if !valid {
            return Err(AppError::Session(format!(
                "Invalid session transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!("Session transition: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    /// A new session may only begin before the first start or after full teardown.
    pub fn can_start(&self) -> bool {
        matches!(
            self.current(),
            SessionState::Uninitialized | SessionState::Terminated
        )
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}
