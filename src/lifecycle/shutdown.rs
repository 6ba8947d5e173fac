//! Shutdown coordination for the HTTP surface.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to every subscriber.
///
/// The server subscribes before it starts serving; the binary or a test
/// holds the `Shutdown` and fires it. Only the first trigger is broadcast.
#[derive(Debug)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the stop signal. Returns how many subscribers were notified;
    /// repeated triggers notify nobody.
    pub fn trigger(&self) -> usize {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = notified, "Shutdown triggered");
        notified
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_trigger_fires_once() {
        let shutdown = Shutdown::default();
        let _rx = shutdown.subscribe();
        assert_eq!(shutdown.trigger(), 1);
        assert_eq!(shutdown.trigger(), 0);
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let shutdown = Shutdown::default();
        assert_eq!(shutdown.trigger(), 0);
        assert!(shutdown.is_triggered());
    }
}
