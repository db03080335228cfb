//! Stop signalling for the engine's background tasks.
//!
//! The stop request is a sticky `tokio::sync::watch` value: a task that
//! subscribes after the request still sees it, and the first reason wins.

use tokio::signal;
use tokio::sync::watch;

/// Why the engine is stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// [`crate::CoopEngine::stop`] or another in-process caller.
    Requested,
    /// SIGINT / ctrl-c.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

pub struct ShutdownController {
    tx: watch::Sender<Option<ShutdownReason>>,
}

/// Receiving half handed to each background task.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request a stop. Later requests keep the first reason.
    pub fn trigger(&self, reason: ShutdownReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
        if first {
            tracing::debug!(?reason, "stop requested");
        }
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Block until the process receives SIGINT or SIGTERM, record it and
    /// return it.
    pub async fn wait_for_os_signal(&self) -> ShutdownReason {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let reason = tokio::select! {
            _ = signal::ctrl_c() => ShutdownReason::Interrupt,
            _ = terminate => ShutdownReason::Terminate,
        };
        tracing::info!(?reason, "stop signal received");
        self.trigger(reason);
        reason
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolve once a stop has been requested. A dropped controller counts
    /// as a request.
    pub async fn triggered(&mut self) -> ShutdownReason {
        match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Requested),
            Err(_) => ShutdownReason::Requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn every_task_sees_the_request() {
        let controller = ShutdownController::new();
        let mut tick_task = controller.signal();
        let mut other = controller.signal();
        assert!(!tick_task.is_triggered());

        controller.trigger(ShutdownReason::Requested);
        assert_eq!(tick_task.triggered().await, ShutdownReason::Requested);
        assert_eq!(other.triggered().await, ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn request_is_sticky_for_late_subscribers() {
        let controller = ShutdownController::new();
        controller.trigger(ShutdownReason::Terminate);
        let mut late = controller.signal();
        assert!(late.is_triggered());
        assert_eq!(late.triggered().await, ShutdownReason::Terminate);
    }

    #[tokio::test]
    async fn first_reason_wins() {
        let controller = ShutdownController::new();
        controller.trigger(ShutdownReason::Interrupt);
        controller.trigger(ShutdownReason::Requested);
        assert_eq!(controller.reason(), Some(ShutdownReason::Interrupt));
    }

    #[tokio::test(start_paused = true)]
    async fn untriggered_signal_stays_pending() {
        let controller = ShutdownController::new();
        let mut signal = controller.signal();
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.triggered()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn dropped_controller_releases_waiters() {
        let controller = ShutdownController::new();
        let mut signal = controller.signal();
        drop(controller);
        assert_eq!(signal.triggered().await, ShutdownReason::Requested);
    }
}
