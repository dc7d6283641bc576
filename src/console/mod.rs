//! Render surface.
//!
//! [`Console`] owns a [`TerminalBackend`] and tracks everything the backend
//! does not: terminal size, cursor row and column, the active attributes and
//! colors, and whether raw mode and the cursor are in effect. Sections draw
//! through its primitives and never touch the backend directly.
//!
//! Coordinates are zero-based. Output past the right edge is clipped, output
//! below the last row is dropped.
//!
//! I/O errors from drawing primitives are sticky: the first one is kept and
//! returned by the next [`Console::flush`], so rendering code stays free of
//! error plumbing. Raw mode and cursor visibility are best-effort and only
//! logged.

pub mod ansi;
pub mod backend;
pub mod events;
pub mod ratatui_backend;
pub mod recording;

pub use ansi::AnsiBackend;
pub use backend::{Color, Input, Style, TerminalBackend};
pub use events::{CrosstermInput, InputSource, ScriptedInput};
pub use ratatui_backend::RatatuiBackend;
pub use recording::{Call, RecordingBackend};

#[cfg(unix)]
pub use events::TtyInput;

use crate::error::Result;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest single wait inside [`Console::read_key`], so cancellation is
/// noticed promptly.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Box-drawing glyphs for [`Console::window`].
const BOX_TOP_LEFT: char = '╔';
const BOX_TOP_RIGHT: char = '╗';
const BOX_BOTTOM_LEFT: char = '╚';
const BOX_BOTTOM_RIGHT: char = '╝';
const BOX_HORIZONTAL: char = '═';
const BOX_VERTICAL: char = '║';

/// Observable console state, identical for every backend given the same calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ConsoleState {
    /// Terminal width.
    pub width: u16,
    /// Terminal height.
    pub height: u16,
    /// Cursor row.
    pub row: u16,
    /// Cursor column.
    pub col: u16,
    /// Active attributes and colors.
    pub style: Style,
    /// Raw mode requested.
    pub raw: bool,
    /// Cursor visible.
    pub cursor_visible: bool,
    /// Terminal restored for exit.
    pub restored: bool,
}

/// Builds the text of a bracketed gauge.
///
/// The interior is always `width` characters: `floor(width * percent / 100)`
/// fill characters, blanks for the rest. `percent` is clamped to 0..=100;
/// NaN counts as 0.
#[must_use]
pub fn gauge_text(width: u16, percent: f64, fill: char) -> String {
    let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
    let width = usize::from(width);
    let filled = ((width as f64 * percent / 100.0).floor() as usize).min(width);

    let mut out = String::with_capacity(width + 2);
    out.push('[');
    out.extend(std::iter::repeat(fill).take(filled));
    out.extend(std::iter::repeat(' ').take(width - filled));
    out.push(']');
    out
}

/// Stateful drawing facade over a terminal backend.
#[derive(Debug)]
pub struct Console<B: TerminalBackend> {
    backend: B,
    width: u16,
    height: u16,
    row: u16,
    col: u16,
    style: Style,
    raw: bool,
    cursor_visible: bool,
    restored: bool,
    error: Option<io::Error>,
}

impl<B: TerminalBackend> Console<B> {
    /// Wraps `backend` and measures the terminal.
    pub fn new(backend: B) -> Self {
        let mut console = Self {
            backend,
            width: 0,
            height: 0,
            row: 0,
            col: 0,
            style: Style::default(),
            raw: false,
            cursor_visible: true,
            restored: false,
            error: None,
        };
        console.measure();
        console
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Re-reads the terminal size. Keeps the old size if the backend fails.
    pub fn measure(&mut self) -> (u16, u16) {
        match self.backend.size() {
            Ok((width, height)) => {
                if (width, height) != (self.width, self.height) {
                    let backend = self.backend.name();
                    tracing::debug!(width, height, backend, "terminal measured");
                }
                self.width = width;
                self.height = height;
            }
            Err(e) => tracing::warn!(error = %e, "could not read terminal size"),
        }
        (self.width, self.height)
    }

    /// Terminal width.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Terminal height.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Cursor row.
    pub fn row(&self) -> u16 {
        self.row
    }

    /// Cursor column.
    pub fn col(&self) -> u16 {
        self.col
    }

    /// Snapshot of the tracked state.
    pub fn state(&self) -> ConsoleState {
        ConsoleState {
            width: self.width,
            height: self.height,
            row: self.row,
            col: self.col,
            style: self.style,
            raw: self.raw,
            cursor_visible: self.cursor_visible,
            restored: self.restored,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn check(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
    }

    // ========================================================================
    // Cursor and clearing
    // ========================================================================

    /// Moves the cursor to an absolute position.
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.row = row;
        self.col = col;
        let result = self.backend.move_to(row, col);
        self.check(result);
    }

    /// Clears the screen (or from the cursor to the end) and homes the
    /// cursor for a full clear.
    pub fn clear_screen(&mut self, to_end_only: bool) {
        if !to_end_only {
            self.move_to(0, 0);
        }
        let result = self.backend.clear_screen(to_end_only);
        self.check(result);
    }

    /// Clears from the cursor to the end of the line.
    pub fn clear_eol(&mut self) {
        let result = self.backend.clear_to_eol();
        self.check(result);
    }

    // ========================================================================
    // Text
    // ========================================================================

    /// Writes text at the cursor, clipped at the right edge.
    pub fn print(&mut self, text: &str) {
        if self.row >= self.height || self.col >= self.width {
            return;
        }
        let room = usize::from(self.width - self.col);
        let clipped: String = text.chars().take(room).collect();
        let written = clipped.chars().count() as u16;
        let result = self.backend.write_text(&clipped);
        self.check(result);
        self.col += written;
    }

    /// Clears the rest of the line and moves to the start of the next one.
    ///
    /// A line already filled to the right edge is not cleared: terminals in
    /// the pending-wrap state would erase the last cell.
    pub fn newline(&mut self) {
        if self.row < self.height && self.col < self.width {
            self.clear_eol();
        }
        let next = self.row.saturating_add(1);
        self.move_to(next, 0);
    }

    /// Writes text followed by a newline.
    pub fn println(&mut self, text: &str) {
        self.print(text);
        self.newline();
    }

    /// Writes a full-width inverse banner: the text, then inverse blanks to
    /// the right edge, then a newline. Other attributes are kept.
    pub fn inverse_line(&mut self, text: &str) {
        let was_inverse = self.style.inverse;
        self.mode_inverse(true);
        self.print(text);
        let pad = usize::from(self.width.saturating_sub(self.col));
        if pad > 0 {
            self.print(&" ".repeat(pad));
        }
        self.mode_inverse(was_inverse);
        self.newline();
    }

    /// Draws a gauge of `width` interior cells at the cursor.
    pub fn gauge(&mut self, width: u16, percent: f64, fill: char) {
        self.print(&gauge_text(width, percent, fill));
    }

    /// Draws a double-line box with an optional `[title]` on the top edge,
    /// blanking its interior. The cursor ends up inside the top-left corner.
    pub fn window(&mut self, row: u16, col: u16, width: u16, height: u16, title: Option<&str>) {
        if width < 2 || height < 2 {
            return;
        }
        let inner = usize::from(width - 2);
        let horizontal: String = std::iter::repeat(BOX_HORIZONTAL).take(inner).collect();

        self.move_to(row, col);
        self.print(&format!("{BOX_TOP_LEFT}{horizontal}{BOX_TOP_RIGHT}"));
        let blank = " ".repeat(inner);
        for r in 1..height - 1 {
            self.move_to(row + r, col);
            self.print(&format!("{BOX_VERTICAL}{blank}{BOX_VERTICAL}"));
        }
        self.move_to(row + height - 1, col);
        self.print(&format!("{BOX_BOTTOM_LEFT}{horizontal}{BOX_BOTTOM_RIGHT}"));

        if let Some(title) = title {
            self.move_to(row, col + 2);
            let label: String = title.chars().take(inner.saturating_sub(4)).collect();
            self.print(&format!("[{label}]"));
        }
        self.move_to(row + 1, col + 1);
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Replaces the attributes and colors in one step.
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
        let result = self.backend.set_style(style);
        self.check(result);
    }

    /// Turns bold on or off.
    pub fn mode_bold(&mut self, on: bool) {
        self.set_style(Style {
            bold: on,
            ..self.style
        });
    }

    /// Turns underline on or off.
    pub fn mode_underline(&mut self, on: bool) {
        self.set_style(Style {
            underline: on,
            ..self.style
        });
    }

    /// Turns blink on or off.
    pub fn mode_blink(&mut self, on: bool) {
        self.set_style(Style {
            blink: on,
            ..self.style
        });
    }

    /// Turns inverse video on or off.
    pub fn mode_inverse(&mut self, on: bool) {
        self.set_style(Style {
            inverse: on,
            ..self.style
        });
    }

    /// Clears every attribute and resets both colors.
    pub fn mode_clear(&mut self) {
        self.set_style(Style::default());
    }

    /// Sets the foreground color.
    pub fn set_fg(&mut self, color: Color) {
        self.set_style(Style {
            fg: color,
            ..self.style
        });
    }

    /// Sets the background color.
    pub fn set_bg(&mut self, color: Color) {
        self.set_style(Style {
            bg: color,
            ..self.style
        });
    }

    /// Sets both colors.
    pub fn colors(&mut self, fg: Color, bg: Color) {
        self.set_style(Style {
            fg,
            bg,
            ..self.style
        });
    }

    /// Current attributes and colors.
    pub fn style(&self) -> Style {
        self.style
    }

    // ========================================================================
    // Terminal modes
    // ========================================================================

    /// Enters or leaves raw input mode. Failures are logged and ignored.
    pub fn raw(&mut self, on: bool) {
        match self.backend.set_raw_mode(on) {
            Ok(()) => self.raw = on,
            Err(e) => tracing::warn!(error = %e, on, "raw mode unavailable, continuing without it"),
        }
    }

    /// Shows or hides the cursor. Failures are logged and ignored.
    pub fn show_cursor(&mut self, visible: bool) {
        match self.backend.set_cursor_visible(visible) {
            Ok(()) => self.cursor_visible = visible,
            Err(e) => tracing::warn!(error = %e, visible, "cursor visibility unsupported"),
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Waits up to `timeout` for a key.
    ///
    /// Polls at least once. Resize notifications re-measure the terminal and
    /// the wait continues; they never surface as keys. Returns `None` on
    /// timeout or as soon as `cancel` is set.
    pub fn read_key(&mut self, timeout: Duration, cancel: &AtomicBool) -> Option<char> {
        let deadline = Instant::now() + timeout;
        loop {
            if cancel.load(Ordering::SeqCst) {
                return None;
            }
            let slice = deadline.saturating_duration_since(Instant::now()).min(POLL_SLICE);
            match self.backend.poll_input(slice) {
                Ok(Input::Key(key)) => return Some(key),
                Ok(Input::Resize) => {
                    self.measure();
                }
                Ok(Input::Ignored | Input::Timeout) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "input poll failed");
                    std::thread::sleep(slice);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    // ========================================================================
    // Output and teardown
    // ========================================================================

    /// Pushes the frame to the terminal, reporting any error held since the
    /// last flush.
    pub fn flush(&mut self) -> Result<()> {
        let result = self.backend.flush();
        self.check(result);
        match self.error.take() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Restores the terminal for exit: attributes reset, cursor shown, raw
    /// mode off. Runs once; later calls (including the one from `Drop`) do
    /// nothing.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        tracing::debug!(backend = self.backend.name(), "restoring terminal");

        self.mode_clear();
        self.show_cursor(true);
        self.raw(false);
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "flush during restore failed");
        }
    }

    /// Whether [`Console::restore`] has run.
    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl<B: TerminalBackend> Drop for Console<B> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn console(width: u16, height: u16) -> Console<RecordingBackend> {
        Console::new(RecordingBackend::new(width, height))
    }

    #[test]
    fn test_gauge_examples() {
        assert_eq!(gauge_text(10, 0.0, '>'), "[          ]");
        assert_eq!(gauge_text(10, 100.0, '>'), "[>>>>>>>>>>]");
        assert_eq!(gauge_text(10, 50.0, '>'), "[>>>>>     ]");
        assert_eq!(gauge_text(10, 250.0, '>'), "[>>>>>>>>>>]");
        assert_eq!(gauge_text(10, -5.0, '>'), "[          ]");
        assert_eq!(gauge_text(10, f64::NAN, '>'), "[          ]");
        assert_eq!(gauge_text(4, 99.9, '#'), "[### ]");
    }

    proptest! {
        #[test]
        fn prop_gauge_interior_is_exact(width in 0u16..200, percent in -50.0f64..150.0) {
            let text = gauge_text(width, percent, '■');
            let interior: Vec<char> = text.chars().skip(1).take(usize::from(width)).collect();
            prop_assert_eq!(text.chars().count(), usize::from(width) + 2);
            let filled = interior.iter().filter(|c| **c == '■').count();
            let expected = (f64::from(width) * percent.clamp(0.0, 100.0) / 100.0).floor() as usize;
            prop_assert_eq!(filled, expected);
        }
    }

    #[test]
    fn test_new_measures() {
        let c = console(120, 40);
        assert_eq!((c.width(), c.height()), (120, 40));
    }

    #[test]
    fn test_print_tracks_and_clips() {
        let mut c = console(8, 3);
        c.move_to(1, 5);
        c.print("abcdef");
        assert_eq!(c.col(), 8);
        assert_eq!(c.backend().lines()[1], "     abc");

        c.print("more");
        assert_eq!(c.col(), 8);
    }

    #[test]
    fn test_println_advances_row() {
        let mut c = console(10, 3);
        c.println("one");
        c.println("two");
        assert_eq!((c.row(), c.col()), (2, 0));
        assert_eq!(c.backend().lines(), vec!["one", "two", ""]);
    }

    #[test]
    fn test_output_below_screen_is_dropped() {
        let mut c = console(10, 1);
        c.println("one");
        c.println("two");
        assert_eq!(c.backend().lines(), vec!["one"]);
    }

    #[test]
    fn test_inverse_line_pads_and_restores() {
        let mut c = console(12, 2);
        c.mode_bold(true);
        c.inverse_line("head");

        assert_eq!(c.row(), 1);
        assert!(!c.style().inverse);
        assert!(c.style().bold);
        let inverse_calls = c
            .backend()
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Style(s) if s.inverse && s.bold))
            .count();
        assert_eq!(inverse_calls, 1);
    }

    #[test]
    fn test_window_draws_box_and_title() {
        let mut c = console(20, 6);
        c.window(1, 2, 10, 4, Some("HELP"));
        let lines = c.backend().lines();
        assert_eq!(lines[1], "  ╔═[HELP]═╗");
        assert_eq!(lines[2], "  ║        ║");
        assert_eq!(lines[4], "  ╚════════╝");
        assert_eq!((c.row(), c.col()), (2, 3));
    }

    #[test]
    fn test_attributes_toggle_independently() {
        let mut c = console(10, 1);
        c.mode_bold(true);
        c.mode_underline(true);
        c.mode_bold(false);
        c.set_fg(Color::Cyan);
        let expected = Style {
            underline: true,
            fg: Color::Cyan,
            ..Style::default()
        };
        assert_eq!(c.style(), expected);
        c.mode_clear();
        assert_eq!(c.style(), Style::default());
    }

    #[test]
    fn test_read_key_returns_key() {
        let mut c = console(10, 10);
        c.backend_mut().push_key('m');
        let cancel = AtomicBool::new(false);
        assert_eq!(c.read_key(Duration::from_millis(50), &cancel), Some('m'));
    }

    #[test]
    fn test_read_key_absorbs_resize() {
        let mut c = console(10, 10);
        c.backend_mut().push_resize(120, 50);
        c.backend_mut().push_key('x');
        let cancel = AtomicBool::new(false);

        assert_eq!(c.read_key(Duration::from_millis(50), &cancel), Some('x'));
        assert_eq!((c.width(), c.height()), (120, 50));
    }

    #[test]
    fn test_read_key_times_out() {
        let mut c = console(10, 10);
        let cancel = AtomicBool::new(false);
        let start = Instant::now();
        assert_eq!(c.read_key(Duration::from_millis(20), &cancel), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_read_key_honors_cancel() {
        let mut c = console(10, 10);
        c.backend_mut().push_key('q');
        let cancel = AtomicBool::new(true);
        assert_eq!(c.read_key(Duration::from_secs(5), &cancel), None);
    }

    #[test]
    fn test_restore_runs_once() {
        let mut c = console(10, 10);
        c.raw(true);
        c.show_cursor(false);
        c.restore();
        c.restore();

        let b = c.backend();
        assert!(!b.is_raw());
        assert!(b.cursor_visible());
        assert_eq!(b.count(Call::RawMode(false)), 1);
        assert_eq!(b.count(Call::CursorVisible(true)), 1);
        assert!(c.state().restored);
    }

    #[test]
    fn test_clear_screen_homes_cursor() {
        let mut c = console(10, 3);
        c.println("abc");
        c.clear_screen(false);
        assert_eq!((c.row(), c.col()), (0, 0));
        assert_eq!(c.backend().screen().trim(), "");
    }
}
