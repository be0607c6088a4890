//! The per-order cancellation signal.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Outcome of a cancellable wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed.
    Elapsed,
    /// The token fired before the duration elapsed.
    Cancelled,
}

/// Signal shared by every wait point of one order.
///
/// Only the first reason sticks. Once cancelled, every subsequent wait through the token resolves to
/// [`WaitOutcome::Cancelled`] immediately.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    /// Wakes tasks parked in [`CancellationToken::cancelled`].
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new shared cancellation token.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Cancels the order. Later calls keep the first reason; every parked
    /// waiter is woken.
    pub fn cancel(&self, reason: impl Into<String>) {
        // Reason is written before the flag flips so readers never see a
        // cancelled token without one.
        let mut slot = self.reason.write();
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        *slot = Some(reason.into());
        self.cancelled.store(true, Ordering::SeqCst);
        drop(slot);

        self.notify.notify_waiters();
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the reason given to the first `cancel` call.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking the flag so a concurrent
            // cancel cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Waits for `duration` unless the token fires first.
    ///
    /// A token that is already cancelled returns without waiting.
    pub async fn sleep(&self, duration: Duration) -> WaitOutcome {
        if self.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        tokio::select! {
            biased;
            () = self.cancelled() => WaitOutcome::Cancelled,
            () = tokio::time::sleep(duration) => WaitOutcome::Elapsed,
        }
    }

    /// Spawns a timer task that cancels the token after `delay`.
    pub fn cancel_after(self: &Arc<Self>, delay: Duration, reason: impl Into<String>) -> JoinHandle<()> {
        let token = Arc::clone(self);
        let reason = reason.into();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            token.cancel(reason);
        })
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
