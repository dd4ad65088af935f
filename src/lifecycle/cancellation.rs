//! Cancellation of in-progress confirmation waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Coordinator for cancelling confirmation waits.
///
/// Cloning yields a handle to the same signal.
#[derive(Clone, Debug)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    /// Set once triggered so late waiters observe it.
    fired: AtomicBool,
}

impl Cancellation {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            inner: Arc::new(Inner {
                tx,
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Trigger the signal.
    pub fn trigger(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        let _ = self.inner.tx.send(());
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Resolve once the signal has been triggered.
    pub async fn cancelled(&self) {
        // Subscribe before checking the flag so a concurrent trigger is not missed.
        let mut rx = self.inner.tx.subscribe();
        if self.is_cancelled() {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
                // Unreachable while `self` holds the sender.
                Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
            }
        }
    }

    /// Get the number of waits currently listening.
    pub fn waiter_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
