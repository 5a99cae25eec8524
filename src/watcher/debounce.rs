//! Trailing-edge debounce with a single pending slot.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

/// Delays values until no new value has been scheduled for `window`.
///
/// Scheduling cancels the pending delivery (if any) and starts a new one, so a
/// burst of calls results in one delivery of the last value, `window` after
/// the last call.
pub struct Debouncer<T> {
    window: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Returns the debouncer and the receiver its values are delivered to.
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    pub fn schedule(&mut self, value: T) {
        self.cancel();

        let deadline = Instant::now() + self.window;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(value);
        }));
    }

    /// Drop the pending value without delivering it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_delivers_once_after_last_event() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();

        debouncer.schedule(0);
        tokio::time::advance(Duration::from_millis(10)).await;
        debouncer.schedule(10);
        tokio::time::advance(Duration::from_millis(20)).await;
        debouncer.schedule(30);

        let value = rx.recv().await.unwrap();
        let elapsed = start.elapsed();
        assert_eq!(value, 30);
        assert!(
            elapsed >= Duration::from_millis(130) && elapsed < Duration::from_millis(140),
            "fired at {elapsed:?}"
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err(), "burst must fire exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_deliver_separately() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule("first");
        assert_eq!(rx.recv().await, Some("first"));

        debouncer.schedule("second");
        assert_eq!(rx.recv().await, Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let (mut debouncer, mut rx) = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule(1);
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(rx.try_recv().is_err());
    }
}
