//! Forced navigation out of a dead session
//!
//! A hard redirect is the client's cancellation mechanism: whoever owns the
//! UI root throws away its state and starts over at the entry path. The
//! logout reason is left in session storage for the landing screen.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::routes::Routes;
use super::storage::{keys, SessionStorage};
use super::teardown::SessionTeardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Inactivity,
    SessionExpired,
}

impl LogoutReason {
    /// Value written under [`keys::LOGOUT_REASON`].
    pub fn as_marker(&self) -> &'static str {
        match self {
            LogoutReason::Inactivity => "INACTIVITY",
            LogoutReason::SessionExpired => "SESSION_EXPIRED",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "INACTIVITY" => Some(LogoutReason::Inactivity),
            "SESSION_EXPIRED" => Some(LogoutReason::SessionExpired),
            _ => None,
        }
    }

    /// Message shown to the user after the redirect.
    pub fn message(&self) -> &'static str {
        match self {
            LogoutReason::Inactivity => "You were logged out after a period of inactivity.",
            LogoutReason::SessionExpired => "Your session has expired. Please log in again.",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Performs a hard redirect: the UI root must be rebuilt from scratch.
pub trait Navigator: Send + Sync {
    fn hard_redirect(&self, path: &str);
}

/// Forwards redirects to the UI event loop.
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn hard_redirect(&self, path: &str) {
        if self.tx.send(path.to_string()).is_err() {
            tracing::debug!("UI gone, redirect to {} dropped", path);
        }
    }
}

/// For one-shot CLI commands: the process exits after the command, which
/// is as hard as a redirect gets.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn hard_redirect(&self, path: &str) {
        tracing::info!("Session ended, returning to {}", path);
    }
}

/// Teardown plus redirect, shared by every path that ends a session.
pub struct SessionExit {
    teardown: Arc<SessionTeardown>,
    storage: Arc<dyn SessionStorage>,
    routes: Arc<Routes>,
    navigator: Arc<dyn Navigator>,
}

impl SessionExit {
    pub fn new(
        teardown: Arc<SessionTeardown>,
        storage: Arc<dyn SessionStorage>,
        routes: Arc<Routes>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            teardown,
            storage,
            routes,
            navigator,
        }
    }

    /// Clear the session, record why, and hard-redirect to the entry path.
    pub fn force_logout(&self, reason: LogoutReason) {
        tracing::warn!("{}", reason.message());
        self.teardown.run();
        self.storage.set(keys::LOGOUT_REASON, reason.as_marker());
        self.redirect_to_entry();
    }

    /// Clear the session without a reason marker (user asked for it).
    pub fn logout(&self) {
        self.teardown.run();
        self.redirect_to_entry();
    }

    fn redirect_to_entry(&self) {
        let entry = self.routes.entry_path().to_string();
        self.routes.set_current(&entry);
        self.navigator.hard_redirect(&entry);
    }

    pub fn peek_reason(&self) -> Option<LogoutReason> {
        self.storage
            .get(keys::LOGOUT_REASON)
            .as_deref()
            .and_then(LogoutReason::from_marker)
    }

    pub fn take_reason(&self) -> Option<LogoutReason> {
        let reason = self.peek_reason();
        self.storage.remove(keys::LOGOUT_REASON);
        reason
    }
}
