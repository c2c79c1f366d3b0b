//! Cooperative shutdown signalling between the runner and its workers.
//!
//! Workers check the signal between units of work (for a poller: between
//! ticks) so that an interrupt never cuts a dispatch in half.

use tokio::sync::watch;

/// Create a linked trigger/signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half, owned by the runner.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every [`Shutdown`] holder to stop.
    pub fn trigger(&self) {
        // send_replace stores the value even when no worker is subscribed yet.
        self.tx.send_replace(true);
    }

    /// Get another receiving half.
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half, cloned into each worker.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested or the trigger is gone.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once shutdown is requested or the trigger is dropped.
    pub async fn wait(&mut self) {
        // wait_for returns Err when the sender is gone, which also means stop.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_observed() {
        let (trigger, shutdown) = shutdown_channel();
        assert!(!shutdown.is_triggered());

        trigger.trigger();
        assert!(shutdown.is_triggered());
        assert!(trigger.subscribe().is_triggered());
    }

    #[test]
    fn test_wait_resolves_after_trigger() {
        let (trigger, mut shutdown) = shutdown_channel();
        trigger.trigger();

        tokio_test::block_on(async {
            tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
                .await
                .expect("wait should resolve once triggered");
        });
    }

    #[test]
    fn test_wait_resolves_when_trigger_dropped() {
        let (trigger, mut shutdown) = shutdown_channel();
        drop(trigger);
        assert!(shutdown.is_triggered());

        tokio_test::block_on(async {
            tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
                .await
                .expect("wait should resolve once the trigger is gone");
        });
    }

    #[tokio::test]
    async fn test_wait_pending_until_triggered() {
        let (trigger, mut shutdown) = shutdown_channel();

        let pending = tokio::time::timeout(Duration::from_millis(20), shutdown.wait()).await;
        assert!(pending.is_err());

        trigger.trigger();
        shutdown.wait().await;
    }
}
