//! Interrupt handling
//!
//! A run can be cut short by Ctrl-C. The crawl loop checks the signal before
//! every request and races it against the request in flight, then hands what
//! it has collected to the exporters as usual.

use tokio::sync::watch;

/// Sending half: flips the signal once
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Requests shutdown; later calls are no-ops
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half, polled by the crawl loop
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = shutdown_channel();
        signal
    }

    /// Spawns a task that fires the signal on Ctrl-C
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_ctrl_c() -> Self {
        let (trigger, signal) = shutdown_channel();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::warn!("Interrupt received, finishing with what has been collected");
                    trigger.trigger();
                }
                Err(e) => tracing::error!("Unable to listen for Ctrl-C: {}", e),
            }
        });
        signal
    }

    /// Returns true once shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when shutdown is requested; pends forever if it never can be
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_is_observed() {
        let (trigger, mut signal) = shutdown_channel();
        assert!(!signal.is_triggered());

        trigger.trigger();
        assert!(signal.is_triggered());
        tokio::time::timeout(Duration::from_secs(1), signal.triggered())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let mut signal = ShutdownSignal::never();
        assert!(!signal.is_triggered());
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.triggered()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (trigger, signal) = shutdown_channel();
        let other = signal.clone();
        trigger.trigger();
        assert!(other.is_triggered());
    }
}
