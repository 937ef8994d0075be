//! TUI application state and main event loop

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEventKind,
    MouseEventKind,
};
use crossterm::execute;
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;

use super::backend::{Backend, SessionCommand, SessionEvent};
use super::log_capture::LogBuffer;
use super::ui;
use crate::auth::open_session;
use crate::config::Config;
use crate::session::{
    ActivityKind, BootstrapOutcome, ChannelNavigator, InactivityMonitor, LogoutReason,
    MonitorState, SessionManager, SessionProfile,
};

/// Redraw interval when nothing else happens (idle countdown, log pane)
const TICK: Duration = Duration::from_secs(1);

/// Lines kept for the log pane
const MAX_LOG_LINES: usize = 500;

/// Fallback private route when the cached profile has no usable role
const DEFAULT_DASHBOARD: &str = "/dashboard";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Landing,
    Dashboard,
}

/// Application state
pub struct App {
    pub should_exit: bool,
    pub screen: Screen,
    /// Route the UI currently shows
    pub route: String,
    pub entry_path: String,
    /// Mirrors AuthReadiness; nothing session-dependent renders before it
    pub ready: bool,
    /// A session command is in flight
    pub busy: bool,
    pub profile: SessionProfile,
    /// Logout reason, shown once on the landing screen
    pub notice: Option<LogoutReason>,
    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub idle_remaining: Option<Duration>,
    pub logs: Vec<String>,
    pub show_logs: bool,
}

impl App {
    pub fn new(entry_path: &str, profile: SessionProfile, notice: Option<LogoutReason>) -> Self {
        Self {
            should_exit: false,
            screen: Screen::Landing,
            route: entry_path.to_string(),
            entry_path: entry_path.to_string(),
            ready: false,
            busy: true,
            profile,
            notice,
            status_message: None,
            status_is_error: false,
            idle_remaining: None,
            logs: Vec::new(),
            show_logs: false,
        }
    }

    /// Private route for the signed-in role.
    pub fn dashboard_path(&self) -> String {
        self.profile
            .parsed_role()
            .map(|role| role.dashboard_path().to_string())
            .unwrap_or_else(|| DEFAULT_DASHBOARD.to_string())
    }

    fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status_message = Some(message.into());
        self.status_is_error = is_error;
    }

    /// Map a key press to a session command, if any.
    pub fn handle_key(&mut self, code: KeyCode) -> Option<SessionCommand> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_exit = true;
                None
            }
            KeyCode::Char('l') => {
                self.show_logs = !self.show_logs;
                None
            }
            _ if self.busy || !self.ready => None,
            KeyCode::Enter if self.screen == Screen::Landing => {
                self.busy = true;
                self.notice = None;
                Some(SessionCommand::EnterRoute(self.dashboard_path()))
            }
            KeyCode::Char('r') if self.screen == Screen::Dashboard => {
                self.busy = true;
                Some(SessionCommand::Refresh)
            }
            KeyCode::Char('h') if self.screen == Screen::Dashboard => {
                self.busy = true;
                Some(SessionCommand::EnterRoute(self.entry_path.clone()))
            }
            KeyCode::Char('o') if self.screen == Screen::Dashboard => {
                self.busy = true;
                Some(SessionCommand::Logout)
            }
            _ => None,
        }
    }

    /// Apply a backend result. May return a follow-up command.
    pub fn apply(&mut self, event: SessionEvent, has_token: bool) -> Option<SessionCommand> {
        self.busy = false;
        match event {
            SessionEvent::Entered { path, public, .. } if public => {
                self.screen = Screen::Landing;
                self.route = path;
                None
            }
            SessionEvent::Entered { path, outcome, .. } => {
                if !has_token {
                    self.set_status("No active session. Run `campus-cli login` first.", true);
                    self.busy = true;
                    return Some(SessionCommand::EnterRoute(self.entry_path.clone()));
                }
                self.screen = Screen::Dashboard;
                self.route = path;
                if outcome == BootstrapOutcome::Refreshed {
                    self.set_status("Session refreshed", false);
                }
                None
            }
            SessionEvent::Refreshed(Ok(())) => {
                self.set_status("Session refreshed", false);
                None
            }
            SessionEvent::Refreshed(Err(message)) => {
                self.set_status(format!("Refresh failed: {}", message), true);
                None
            }
            SessionEvent::LoggedOut => None,
        }
    }

    /// The session core hard-redirected: start over at `path`.
    pub fn on_redirect(&mut self, path: &str, notice: Option<LogoutReason>) {
        self.screen = Screen::Landing;
        self.route = path.to_string();
        self.ready = false;
        self.busy = true;
        self.profile = SessionProfile::default();
        self.notice = notice;
        self.status_message = None;
        self.status_is_error = false;
        self.idle_remaining = None;
    }

    pub fn push_logs(&mut self, lines: Vec<String>) {
        if lines.is_empty() {
            return;
        }
        self.logs.extend(lines);
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }
}

/// Interactions that count as user activity for the inactivity monitor.
fn activity_kind(event: &Event) -> Option<ActivityKind> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(ActivityKind::KeyPress),
        Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
            Some(ActivityKind::PointerClick)
        }
        _ => None,
    }
}

/// Run the TUI until the user quits. Restores the terminal on exit.
pub async fn run(config: &Config, logs: LogBuffer) -> Result<()> {
    let (navigator, redirects) = ChannelNavigator::new();
    let session = open_session(config, Arc::new(navigator))?;

    let mut terminal = ratatui::init();
    if let Err(e) = execute!(stdout(), EnableMouseCapture) {
        tracing::warn!("Mouse capture unavailable: {}", e);
    }

    let result = run_app(&mut terminal, session, redirects, logs).await;

    if let Err(e) = execute!(stdout(), DisableMouseCapture) {
        tracing::warn!("Failed to disable mouse capture: {}", e);
    }
    ratatui::restore();
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    session: Arc<SessionManager>,
    mut redirects: mpsc::UnboundedReceiver<String>,
    logs: LogBuffer,
) -> Result<()> {
    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
    let _readiness = session.readiness().subscribe(move |ready| {
        let _ = ready_tx.send(ready);
    });

    let mut backend = Backend::start(session.clone());
    let entry = session.routes().entry_path().to_string();
    let mut app = App::new(&entry, session.profile().load(), session.take_logout_reason());
    let mut monitor: Option<InactivityMonitor> = None;
    backend.send(SessionCommand::EnterRoute(entry));

    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    while !app.should_exit {
        app.push_logs(logs.drain());
        app.idle_remaining = monitor
            .as_ref()
            .filter(|m| m.state() == MonitorState::Armed)
            .map(|m| m.remaining());
        terminal
            .draw(|frame| ui::render(frame, &app))
            .context("Failed to draw frame")?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if let (Some(kind), Some(monitor)) = (activity_kind(&event), monitor.as_ref()) {
                        monitor.record_activity(kind);
                    }
                    if let Event::Key(key) = event {
                        if key.kind == KeyEventKind::Press {
                            if let Some(cmd) = app.handle_key(key.code) {
                                backend.send(cmd);
                            }
                        }
                    }
                }
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
            Some(ready) = ready_rx.recv() => {
                app.ready = ready;
            }
            Some(event) = backend.recv() => {
                let has_token = session.tokens().get_token().is_some();
                let follow_up = app.apply(event, has_token);
                app.profile = session.profile().load();

                // Only private screens are watched for inactivity
                if app.screen == Screen::Dashboard {
                    if monitor.is_none() {
                        monitor = Some(session.mount_inactivity_monitor());
                    }
                } else {
                    monitor = None;
                }

                if let Some(cmd) = follow_up {
                    backend.send(cmd);
                }
            }
            Some(path) = redirects.recv() => {
                tracing::info!("Redirected to {}", path);
                monitor = None;
                session.reload();
                app.on_redirect(&path, session.take_logout_reason());
                backend.send(SessionCommand::EnterRoute(path));
            }
            _ = tick.tick() => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers, MouseButton, MouseEvent};

    fn ready_app() -> App {
        let mut app = App::new("/", SessionProfile::default(), None);
        app.ready = true;
        app.busy = false;
        app
    }

    #[test]
    fn test_keys_ignored_until_ready() {
        let mut app = App::new("/", SessionProfile::default(), None);
        assert_eq!(app.handle_key(KeyCode::Enter), None);

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_exit);
    }

    #[test]
    fn test_enter_goes_to_role_dashboard() {
        let mut app = ready_app();
        app.profile.role = Some("DOCENTE".into());

        assert_eq!(
            app.handle_key(KeyCode::Enter),
            Some(SessionCommand::EnterRoute("/docente".into()))
        );
        assert!(app.busy);
    }

    #[test]
    fn test_private_route_without_token_returns_to_landing() {
        let mut app = ready_app();
        let follow_up = app.apply(
            SessionEvent::Entered {
                path: "/dashboard".into(),
                public: false,
                outcome: BootstrapOutcome::RefreshFailed,
            },
            false,
        );

        assert_eq!(follow_up, Some(SessionCommand::EnterRoute("/".into())));
        assert_eq!(app.screen, Screen::Landing);
        assert!(app.status_is_error);
    }

    #[test]
    fn test_dashboard_commands() {
        let mut app = ready_app();
        app.apply(
            SessionEvent::Entered {
                path: "/alumno".into(),
                public: false,
                outcome: BootstrapOutcome::Refreshed,
            },
            true,
        );
        assert_eq!(app.screen, Screen::Dashboard);
        assert_eq!(app.route, "/alumno");

        assert_eq!(app.handle_key(KeyCode::Char('o')), Some(SessionCommand::Logout));
        // Busy until the logout reports back
        assert_eq!(app.handle_key(KeyCode::Char('r')), None);
    }

    #[test]
    fn test_redirect_resets_to_landing_with_notice() {
        let mut app = ready_app();
        app.screen = Screen::Dashboard;
        app.profile.name = Some("Ana".into());

        app.on_redirect("/", Some(LogoutReason::Inactivity));

        assert_eq!(app.screen, Screen::Landing);
        assert!(!app.ready);
        assert!(app.profile.is_empty());
        assert_eq!(app.notice, Some(LogoutReason::Inactivity));
    }

    #[test]
    fn test_activity_kinds() {
        let key = Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(activity_kind(&key), Some(ActivityKind::KeyPress));

        let click = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(activity_kind(&click), Some(ActivityKind::PointerClick));

        let moved = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(activity_kind(&moved), None);
        assert_eq!(activity_kind(&Event::FocusGained), None);
    }
}
