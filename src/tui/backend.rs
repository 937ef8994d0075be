//! Async backend: runs session operations off the UI loop.
//!
//! The TUI sends `SessionCommand` values over an mpsc channel; each one runs
//! on its own tokio task and reports back with a `SessionEvent`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::session::{BootstrapOutcome, SessionManager};

/// Commands sent from the TUI event loop to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Navigate to a route and run the session bootstrap for it.
    EnterRoute(String),
    /// Ask for a new access token through the single-flight refresh.
    Refresh,
    Logout,
}

/// Results reported back to the TUI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Entered {
        path: String,
        public: bool,
        outcome: BootstrapOutcome,
    },
    Refreshed(Result<(), String>),
    LoggedOut,
}

pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    resp_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Backend {
    pub fn start(session: Arc<SessionManager>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(session, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    pub fn send(&self, cmd: SessionCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed, command dropped");
        }
    }

    /// Next event from the backend. Meant for `tokio::select!`.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    session: Arc<SessionManager>,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
    resp_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let session = Arc::clone(&session);
        let resp_tx = resp_tx.clone();

        tokio::spawn(async move {
            let event = match cmd {
                SessionCommand::EnterRoute(path) => {
                    let outcome = session.enter_route(&path).await;
                    let public = session.routes().is_public(&path);
                    SessionEvent::Entered {
                        path,
                        public,
                        outcome,
                    }
                }
                SessionCommand::Refresh => {
                    let result = session.client().refresh_token().await;
                    SessionEvent::Refreshed(result.map(|_| ()).map_err(|e| e.to_string()))
                }
                SessionCommand::Logout => {
                    session.logout().await;
                    SessionEvent::LoggedOut
                }
            };
            let _ = resp_tx.send(event);
        });
    }
}
