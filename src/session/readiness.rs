//! "Has the first auth determination finished" flag
//!
//! UI code subscribes to this instead of rendering a logged-out state while
//! the startup refresh is still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;

type Callback = Arc<dyn Fn(bool) + Send + Sync>;
type Subscribers = Mutex<Vec<(u64, Callback)>>;

pub struct AuthReadiness {
    ready: watch::Sender<bool>,
    subscribers: Arc<Subscribers>,
    next_id: AtomicU64,
}

impl AuthReadiness {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            ready,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Set the flag and notify every current subscriber synchronously.
    pub fn set_ready(&self, ready: bool) {
        self.ready.send_replace(ready);
        self.notify(ready);
    }

    /// Flip false to true. Returns whether this call made the transition;
    /// of any number of racing callers exactly one does, and only that one
    /// notifies subscribers.
    pub fn mark_ready(&self) -> bool {
        let flipped = self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
        if flipped {
            self.notify(true);
        }
        flipped
    }

    fn notify(&self, ready: bool) {
        // Snapshot so callbacks may subscribe or unsubscribe re-entrantly
        let callbacks: Vec<Callback> = {
            let guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in callbacks {
            cb(ready);
        }
    }

    /// Register `callback` for every future `set_ready`. Dropping the
    /// returned [`Subscription`] unregisters it.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        guard.push((id, Arc::new(callback)));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Suspend until the flag is true.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Back to "not determined". Only used when the UI root restarts.
    pub(crate) fn reset(&self) {
        self.set_ready(false);
    }
}

impl Default for AuthReadiness {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer returned by [`AuthReadiness::subscribe`].
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut guard = subscribers.lock().unwrap_or_else(|e| e.into_inner());
            guard.retain(|(id, _)| *id != self.id);
        }
    }
}
