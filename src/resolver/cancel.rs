use std::sync::Arc;

use tokio::sync::watch;

/// Cooperative cancellation signal for resolver calls.
///
/// Clones share the same signal. Cancelling is one-way and idempotent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the token is cancelled; pending forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the token, so this only
        // errors if it was dropped mid-wait; treat that as never cancelled.
        let woke = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !woke {
            std::future::pending::<()>().await;
        }
    }
}
