//! Requests parked behind an in-flight token refresh

use std::collections::VecDeque;

use tokio::sync::oneshot;

use super::error::SessionError;

/// What a refresh episode ends with: the new token, or why there is none.
pub type RefreshOutcome = Result<String, SessionError>;

/// FIFO of deferred handles, one per stalled request.
///
/// [`RefreshWaitQueue::settle`] consumes the queue, so it cannot outlive the
/// episode it was created for and each waiter is settled exactly once.
#[derive(Default)]
pub struct RefreshWaitQueue {
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

impl RefreshWaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park one request; the receiver resolves when the episode settles.
    pub fn push(&mut self) -> oneshot::Receiver<RefreshOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Hand `outcome` to every waiter in arrival order. Returns how many
    /// were still listening.
    pub fn settle(self, outcome: &RefreshOutcome) -> usize {
        let mut delivered = 0;
        for tx in self.waiters {
            if tx.send(outcome.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}
