//! Startup auth determination
//!
//! On every route entry, decide whether a silent refresh is worth trying,
//! and mark the app auth-ready once that decision has played out.

use std::sync::{Arc, Mutex};

use super::client::SessionClient;
use super::profile::ProfileCache;
use super::readiness::AuthReadiness;
use super::routes::Routes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Public route with no session hints: no network call made.
    Skipped,
    Refreshed,
    /// Refresh attempted and failed; expected when there is no session.
    RefreshFailed,
    /// Same path as the last run, nothing re-evaluated.
    Unchanged,
}

pub struct SessionBootstrapper {
    client: Arc<SessionClient>,
    routes: Arc<Routes>,
    profile: Arc<ProfileCache>,
    readiness: Arc<AuthReadiness>,
    last_path: Mutex<Option<String>>,
}

impl SessionBootstrapper {
    pub fn new(
        client: Arc<SessionClient>,
        routes: Arc<Routes>,
        profile: Arc<ProfileCache>,
        readiness: Arc<AuthReadiness>,
    ) -> Self {
        Self {
            client,
            routes,
            profile,
            readiness,
            last_path: Mutex::new(None),
        }
    }

    /// Run for a navigation to `path`. Re-evaluates only when the path
    /// differs from the previous run.
    pub async fn on_route(&self, path: &str) -> BootstrapOutcome {
        {
            let mut last = self.last_path.lock().unwrap_or_else(|e| e.into_inner());
            if last.as_deref() == Some(path) {
                return BootstrapOutcome::Unchanged;
            }
            *last = Some(path.to_string());
        }
        self.routes.set_current(path);

        let attempt = !self.routes.is_public(path) || self.profile.has_hints();
        let outcome = if attempt {
            match self.client.try_refresh().await {
                Ok(_) => BootstrapOutcome::Refreshed,
                Err(e) => {
                    tracing::debug!("Silent refresh on {} failed: {}", path, e);
                    BootstrapOutcome::RefreshFailed
                }
            }
        } else {
            tracing::debug!("Public route {} without session hints, skipping refresh", path);
            BootstrapOutcome::Skipped
        };

        self.readiness.mark_ready();
        outcome
    }

    /// Forget the last path so the next navigation bootstraps again.
    pub(crate) fn forget_route(&self) {
        let mut last = self.last_path.lock().unwrap_or_else(|e| e.into_inner());
        *last = None;
    }
}
