//! Terminal UI for Campus Virtual
//!
//! A landing screen at the entry path and a role dashboard on a private
//! route, driven by the session core. Uses Ratatui.

mod app;
mod backend;
mod log_capture;
mod ui;

pub use app::run;
pub use log_capture::LogBuffer;
