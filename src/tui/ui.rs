//! UI rendering for the TUI

use std::time::Duration;

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use super::app::{App, Screen};

const LOG_PANE_HEIGHT: u16 = 8;

/// Status indicator symbol and color for the readiness flag
fn readiness_indicator(ready: bool, busy: bool) -> (&'static str, Color) {
    match (ready, busy) {
        (false, _) => ("checking session", Color::Yellow),
        (true, true) => ("working", Color::Yellow),
        (true, false) => ("ready", Color::Green),
    }
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let log_height = if app.show_logs { LOG_PANE_HEIGHT } else { 0 };

    let [header_area, main_area, log_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(log_height),
        Constraint::Length(1),
    ])
    .areas(area);

    let buf = frame.buffer_mut();
    render_header(header_area, buf, app);
    match app.screen {
        Screen::Landing => render_landing(main_area, buf, app),
        Screen::Dashboard => render_dashboard(main_area, buf, app),
    }
    if app.show_logs {
        render_logs(log_area, buf, app);
    }
    render_status(status_area, buf, app);
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = Span::styled(
        " Campus Virtual",
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let (label, color) = readiness_indicator(app.ready, app.busy);
    let user = app.profile.name.as_deref().unwrap_or("guest");
    let right = format!(" {}  {} ", label, user);

    let left_width = " Campus Virtual".len();
    let padding_width = area.width.saturating_sub((left_width + right.len()) as u16) as usize;

    let line = Line::from(vec![
        title,
        Span::raw(" ".repeat(padding_width)),
        Span::styled(format!(" {} ", label), Style::default().fg(color)),
        Span::styled(format!(" {} ", user), Style::default().fg(Color::Cyan)),
    ]);

    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_landing(area: Rect, buf: &mut Buffer, app: &App) {
    let mut lines = vec![Line::from("")];

    if let Some(reason) = app.notice {
        lines.push(Line::from(Span::styled(
            format!("  {}", reason.message()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }

    if !app.ready {
        lines.push(Line::from("  Checking session..."));
    } else if app.profile.is_empty() {
        lines.push(Line::from("  Not signed in."));
        lines.push(Line::from(Span::styled(
            "  Run `campus-cli login --email <email>` to sign in.",
            Style::default().fg(Color::Gray),
        )));
    } else {
        let name = app.profile.name.as_deref().unwrap_or("(unknown)");
        lines.push(Line::from(format!("  Welcome back, {}.", name)));
        lines.push(Line::from(Span::styled(
            format!("  Press Enter to open {}", app.dashboard_path()),
            Style::default().fg(Color::Gray),
        )));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Home "))
        .wrap(Wrap { trim: false })
        .render(area, buf);
}

fn render_dashboard(area: Rect, buf: &mut Buffer, app: &App) {
    let title = match app.profile.parsed_role() {
        Some(role) => format!(" {} dashboard ", role),
        None => " Dashboard ".to_string(),
    };

    let label = Style::default().fg(Color::Gray);
    let field = |name: &'static str, value: &Option<String>| {
        Line::from(vec![
            Span::styled(format!("  {:<8}", name), label),
            Span::raw(value.as_deref().unwrap_or("-").to_string()),
        ])
    };

    let mut lines = vec![
        Line::from(""),
        field("Name", &app.profile.name),
        field("Email", &app.profile.email),
        field("Role", &app.profile.role),
        field("DNI", &app.profile.national_id),
    ];
    if app.profile.level.is_some() || app.profile.grade.is_some() {
        lines.push(field("Level", &app.profile.level));
        lines.push(field("Grade", &app.profile.grade));
    }

    lines.push(Line::from(""));
    if let Some(remaining) = app.idle_remaining {
        let color = if remaining < Duration::from_secs(60) {
            Color::Red
        } else {
            Color::Gray
        };
        lines.push(Line::from(Span::styled(
            format!("  Idle logout in {}", format_remaining(remaining)),
            Style::default().fg(color),
        )));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(area, buf);
}

fn render_logs(area: Rect, buf: &mut Buffer, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = app.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = app.logs[start..]
        .iter()
        .map(|l| Line::from(Span::styled(l.as_str(), Style::default().fg(Color::Gray))))
        .collect();

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::TOP).title(" Log "))
        .render(area, buf);
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).bg(Color::DarkGray)
        };
        Paragraph::new(Line::from(Span::styled(format!(" {} ", msg), style)))
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let hints = match app.screen {
        Screen::Landing => "Enter: dashboard | l: log | q: quit",
        Screen::Dashboard => "r: refresh | h: home | o: logout | l: log | q: quit",
    };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", app.route), Style::default().fg(Color::Yellow)),
        Span::styled("| ", Style::default().fg(Color::Gray)),
        Span::styled(hints, Style::default().fg(Color::Gray)),
    ]);

    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
