use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;

pub struct ShutdownHandler {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    pub async fn install(self) -> ShutdownGuard {
        let shutdown_requested = Arc::clone(&self.shutdown_requested);
        let shutdown_notify = Arc::clone(&self.shutdown_notify);

        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl-C handler: {}", e);
                return;
            }
            tracing::info!("Shutdown requested via Ctrl-C");
            shutdown_requested.store(true, Ordering::SeqCst);
            shutdown_notify.notify_waiters();
        });

        ShutdownGuard {
            shutdown_requested: self.shutdown_requested,
            shutdown_notify: self.shutdown_notify,
        }
    }

    /// Guard without the signal hook, for tests and embedding.
    pub fn into_guard(self) -> ShutdownGuard {
        ShutdownGuard {
            shutdown_requested: self.shutdown_requested,
            shutdown_notify: self.shutdown_notify,
        }
    }
}

#[derive(Clone)]
pub struct ShutdownGuard {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl ShutdownGuard {
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.is_shutdown_requested() {
            return;
        }
        self.shutdown_notify.notified().await;
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }
}
