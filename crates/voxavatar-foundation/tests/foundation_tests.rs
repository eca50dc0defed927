use voxavatar_foundation::{AudioError, SessionState, SessionStateManager, ShutdownHandler};

#[test]
fn session_starts_uninitialized() {
    let mgr = SessionStateManager::new();
    assert_eq!(mgr.current(), SessionState::Uninitialized);
    assert!(mgr.can_start());
}

#[test]
fn full_session_lifecycle_is_valid() {
    let mgr = SessionStateManager::new();
    mgr.transition(SessionState::Starting).unwrap();
    mgr.transition(SessionState::Active).unwrap();
    mgr.transition(SessionState::Terminating).unwrap();
    mgr.transition(SessionState::Terminated).unwrap();
    assert_eq!(mgr.current(), SessionState::Terminated);
}

#[test]
fn unsolicited_disconnect_goes_straight_to_terminated() {
    let mgr = SessionStateManager::new();
    mgr.transition(SessionState::Starting).unwrap();
    mgr.transition(SessionState::Active).unwrap();
    mgr.transition(SessionState::Terminated).unwrap();
    assert_eq!(mgr.current(), SessionState::Terminated);
}

#[test]
fn failed_start_falls_back_to_terminated() {
    let mgr = SessionStateManager::new();
    mgr.transition(SessionState::Starting).unwrap();
    mgr.transition(SessionState::Terminated).unwrap();
    assert!(mgr.can_start());
}

#[test]
fn reentry_after_termination_is_allowed() {
    let mgr = SessionStateManager::new();
    mgr.transition(SessionState::Starting).unwrap();
    mgr.transition(SessionState::Active).unwrap();
    mgr.transition(SessionState::Terminating).unwrap();
    mgr.transition(SessionState::Terminated).unwrap();
    mgr.transition(SessionState::Starting).unwrap();
    assert_eq!(mgr.current(), SessionState::Starting);
}

#[test]
fn concurrent_start_is_blocked() {
    let mgr = SessionStateManager::new();
    mgr.transition(SessionState::Starting).unwrap();
    assert!(!mgr.can_start());
    assert!(mgr.transition(SessionState::Starting).is_err());

    mgr.transition(SessionState::Active).unwrap();
    assert!(!mgr.can_start());
    assert!(mgr.transition(SessionState::Starting).is_err());
}

#[test]
fn invalid_transitions_are_rejected() {
    let mgr = SessionStateManager::new();
    assert!(mgr.transition(SessionState::Active).is_err());
    assert!(mgr.transition(SessionState::Terminating).is_err());
    assert_eq!(mgr.current(), SessionState::Uninitialized);
}

#[test]
fn subscribers_observe_transitions() {
    let mgr = SessionStateManager::new();
    let rx = mgr.subscribe();
    mgr.transition(SessionState::Starting).unwrap();
    mgr.transition(SessionState::Active).unwrap();
    assert_eq!(rx.try_recv().unwrap(), SessionState::Starting);
    assert_eq!(rx.try_recv().unwrap(), SessionState::Active);
}

#[test]
fn capture_acquisition_errors_are_fatal_to_start() {
    assert!(AudioError::PermissionDenied.is_fatal_to_start());
    assert!(AudioError::DeviceUnavailable { name: None }.is_fatal_to_start());
    assert!(!AudioError::DeviceDisconnected.is_fatal_to_start());
}

#[tokio::test]
async fn shutdown_guard_wakes_waiters() {
    let guard = ShutdownHandler::new().into_guard();
    assert!(!guard.is_shutdown_requested());
    guard.request_shutdown();
    assert!(guard.is_shutdown_requested());
    // Must not hang once the request flag is set.
    guard.wait().await;
}
