//! In-memory log sink for TUI mode
//!
//! tracing-subscriber writes here instead of stderr while the alternate
//! screen is active; the log pane drains it on every frame.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

const CAPACITY: usize = 256;

/// Bounded, shared buffer of formatted log lines. Oldest lines are dropped
/// first.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Take every buffered line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.drain(..).collect()
    }
}

/// Per-event writer. Splits on newlines; a trailing partial line is pushed
/// when the writer is dropped.
pub struct LineWriter {
    buffer: LogBuffer,
    pending: Vec<u8>,
}

impl LineWriter {
    fn take_pending(&mut self) {
        if !self.pending.is_empty() {
            let text = String::from_utf8_lossy(&self.pending).into_owned();
            self.buffer.push(text);
            self.pending.clear();
        }
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                self.take_pending();
            } else {
                self.pending.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.take_pending();
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        self.take_pending();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            buffer: self.clone(),
            pending: Vec::new(),
        }
    }
}
