//! In-memory backend that records every call.
//!
//! Keeps a character grid of what would be on screen, the raw/cursor
//! toggles, and a log of terminal-state changes, so tests can check both
//! layout and cleanup behavior without a terminal.

use super::backend::{Input, Style, TerminalBackend};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// A state-changing call seen by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `set_raw_mode(enabled)`.
    RawMode(bool),
    /// `set_cursor_visible(visible)`.
    CursorVisible(bool),
    /// `set_style(style)`.
    Style(Style),
    /// `clear_screen(to_end_only)`.
    ClearScreen(bool),
    /// `flush()`.
    Flush,
}

/// Scripted event, optionally changing the terminal size when delivered.
#[derive(Debug, Clone, Copy)]
enum Event {
    Input(Input),
    Resize(u16, u16),
}

/// A [`TerminalBackend`] that draws into memory.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    width: u16,
    height: u16,
    grid: Vec<Vec<char>>,
    row: u16,
    col: u16,
    raw: bool,
    cursor_visible: bool,
    calls: Vec<Call>,
    events: VecDeque<Event>,
    flushes: usize,
}

impl RecordingBackend {
    /// Creates a blank `width` × `height` screen.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            grid: vec![vec![' '; usize::from(width)]; usize::from(height)],
            row: 0,
            col: 0,
            raw: false,
            cursor_visible: true,
            calls: Vec::new(),
            events: VecDeque::new(),
            flushes: 0,
        }
    }

    /// Queues a key press.
    pub fn push_key(&mut self, key: char) {
        self.events.push_back(Event::Input(Input::Key(key)));
    }

    /// Queues a resize; the new size takes effect when the event is read.
    pub fn push_resize(&mut self, width: u16, height: u16) {
        self.events.push_back(Event::Resize(width, height));
    }

    /// Resizes immediately, without an event (as if SIGWINCH was missed).
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.grid = vec![vec![' '; usize::from(width)]; usize::from(height)];
    }

    /// Screen contents, one string per row, trailing blanks trimmed.
    pub fn lines(&self) -> Vec<String> {
        self.grid.iter().map(|row| row.iter().collect::<String>().trim_end().to_string()).collect()
    }

    /// Whole screen as one newline-joined string.
    pub fn screen(&self) -> String {
        self.lines().join("\n")
    }

    /// Whether any row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    /// Every recorded state change, in order.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// How many times `call` was recorded.
    pub fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Whether raw mode is on.
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Whether the cursor is visible.
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Number of flushes.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    fn blank_from(&mut self, row: u16, col: u16) {
        if let Some(line) = self.grid.get_mut(usize::from(row)) {
            for cell in line.iter_mut().skip(usize::from(col)) {
                *cell = ' ';
            }
        }
    }
}

impl TerminalBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn size(&mut self) -> io::Result<(u16, u16)> {
        Ok((self.width, self.height))
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.row = row;
        self.col = col;
        Ok(())
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        self.calls.push(Call::Style(style));
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let Some(line) = self.grid.get_mut(usize::from(self.row)) else { return Ok(()) };
        for ch in text.chars() {
            if let Some(cell) = line.get_mut(usize::from(self.col)) {
                *cell = ch;
            }
            self.col = self.col.saturating_add(1);
        }
        Ok(())
    }

    fn clear_screen(&mut self, to_end_only: bool) -> io::Result<()> {
        self.calls.push(Call::ClearScreen(to_end_only));
        if to_end_only {
            self.blank_from(self.row, self.col);
            for row in self.row.saturating_add(1)..self.height {
                self.blank_from(row, 0);
            }
        } else {
            for row in 0..self.height {
                self.blank_from(row, 0);
            }
        }
        Ok(())
    }

    fn clear_to_eol(&mut self) -> io::Result<()> {
        self.blank_from(self.row, self.col);
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        self.calls.push(Call::RawMode(enabled));
        self.raw = enabled;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.calls.push(Call::CursorVisible(visible));
        self.cursor_visible = visible;
        Ok(())
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<Input> {
        match self.events.pop_front() {
            Some(Event::Input(input)) => Ok(input),
            Some(Event::Resize(width, height)) => {
                self.resize(width, height);
                Ok(Input::Resize)
            }
            None => {
                std::thread::sleep(timeout);
                Ok(Input::Timeout)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.calls.push(Call::Flush);
        self.flushes += 1;
        Ok(())
    }
}
