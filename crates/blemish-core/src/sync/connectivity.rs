//! Online/offline signal
//!
//! The monitor carries a boolean fed by platform connectivity transition
//! events; it never probes the network itself. Going online wakes the sync
//! engine's run loop through the watch channel.

use tokio::sync::watch;

/// Writer half, wired to platform connectivity events by the embedding
/// application
#[derive(Debug, Clone)]
pub struct ConnectivityHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl ConnectivityHandle {
    /// Record a connectivity transition
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

/// Reader half, observed by the sync engine
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    rx: watch::Receiver<bool>,
}

impl ConnectivityMonitor {
    /// Current connectivity status
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// A receiver that resolves on every transition
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

/// Create a connected handle/monitor pair with the given initial status
#[must_use]
pub fn connectivity_channel(initially_online: bool) -> (ConnectivityHandle, ConnectivityMonitor) {
    let (tx, rx) = watch::channel(initially_online);
    (
        ConnectivityHandle {
            tx: std::sync::Arc::new(tx),
        },
        ConnectivityMonitor { rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transitions_are_observed() {
        let (handle, monitor) = connectivity_channel(false);
        assert!(!monitor.is_online());

        let mut rx = monitor.subscribe();
        handle.set_online(true);
        rx.changed().await.unwrap();
        assert!(monitor.is_online());

        handle.set_online(false);
        rx.changed().await.unwrap();
        assert!(!monitor.is_online());
    }
}
