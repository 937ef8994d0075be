//! Idle logout
//!
//! A sliding deadline: every qualifying interaction pushes it to
//! `now + threshold`. When it passes untouched, the monitor trips once and
//! stays inert until a new one is mounted.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Default idle threshold (35 minutes).
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(35 * 60);

/// Interactions that count as "the user is still here".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PointerClick,
    KeyPress,
    TouchStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Armed,
    Tripped,
}

struct Shared {
    deadline: Mutex<Instant>,
    tripped: AtomicBool,
}

pub struct InactivityMonitor {
    threshold: Duration,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl InactivityMonitor {
    /// Arm the deadline immediately. `on_trip` runs once, on its own task,
    /// so unmounting the monitor cannot cut a logout short.
    pub fn mount<F, Fut>(threshold: Duration, on_trip: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shared = Arc::new(Shared {
            deadline: Mutex::new(Instant::now() + threshold),
            tripped: AtomicBool::new(false),
        });
        let task = tokio::spawn(watch(shared.clone(), on_trip));

        Self {
            threshold,
            shared,
            task,
        }
    }

    /// Cancel the pending deadline and re-arm it at the full threshold.
    pub fn record_activity(&self, kind: ActivityKind) {
        if self.shared.tripped.load(Ordering::SeqCst) {
            return;
        }
        let mut deadline = self.shared.deadline.lock().unwrap_or_else(|e| e.into_inner());
        *deadline = Instant::now() + self.threshold;
        tracing::trace!(?kind, "Activity, inactivity deadline re-armed");
    }

    pub fn state(&self) -> MonitorState {
        if self.shared.tripped.load(Ordering::SeqCst) {
            MonitorState::Tripped
        } else {
            MonitorState::Armed
        }
    }

    /// Time left before the monitor trips.
    pub fn remaining(&self) -> Duration {
        let deadline = *self.shared.deadline.lock().unwrap_or_else(|e| e.into_inner());
        deadline.saturating_duration_since(Instant::now())
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch<F, Fut>(shared: Arc<Shared>, on_trip: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let deadline = *shared.deadline.lock().unwrap_or_else(|e| e.into_inner());
        time::sleep_until(deadline).await;

        let current = *shared.deadline.lock().unwrap_or_else(|e| e.into_inner());
        if current <= Instant::now() {
            break;
        }
    }

    shared.tripped.store(true, Ordering::SeqCst);
    tracing::info!("No user activity within the inactivity threshold, logging out");
    tokio::spawn(on_trip());
}
