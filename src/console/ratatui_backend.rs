//! Backend drawing through ratatui.
//!
//! Text goes straight into the terminal's current buffer; [`flush`] hands
//! the buffer to ratatui, which writes only the cells that changed since the
//! previous frame and then starts a fresh buffer. That diff is what keeps
//! a full redraw every cycle from flickering.
//!
//! When attached to a real terminal, raw mode and the alternate screen are
//! managed through crossterm. Over a `TestBackend` those toggles are only
//! recorded.
//!
//! [`flush`]: TerminalBackend::flush

use super::backend::{Color, Input, Style, TerminalBackend};
use super::events::InputSource;
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color as TuiColor, Modifier, Style as TuiStyle};
use ratatui::Terminal;
use std::io;
use std::time::Duration;

/// Converts a console style to a ratatui style.
#[must_use]
pub fn to_tui_style(style: Style) -> TuiStyle {
    let color = |c: Color| match c {
        Color::Default => TuiColor::Reset,
        Color::Black => TuiColor::Black,
        Color::Red => TuiColor::Red,
        Color::Green => TuiColor::Green,
        Color::Yellow => TuiColor::Yellow,
        Color::Blue => TuiColor::Blue,
        Color::Magenta => TuiColor::Magenta,
        Color::Cyan => TuiColor::Cyan,
        Color::White => TuiColor::White,
    };
    let mut modifier = Modifier::empty();
    if style.bold {
        modifier |= Modifier::BOLD;
    }
    if style.underline {
        modifier |= Modifier::UNDERLINED;
    }
    if style.blink {
        modifier |= Modifier::SLOW_BLINK;
    }
    if style.inverse {
        modifier |= Modifier::REVERSED;
    }
    TuiStyle::default().fg(color(style.fg)).bg(color(style.bg)).add_modifier(modifier)
}

/// A [`TerminalBackend`] over a ratatui [`Terminal`].
pub struct RatatuiBackend<B: Backend> {
    terminal: Terminal<B>,
    input: Box<dyn InputSource>,
    style: TuiStyle,
    row: u16,
    col: u16,
    manage_tty: bool,
    raw: bool,
}

impl<B: Backend> RatatuiBackend<B> {
    /// Wraps `backend`. With `manage_tty`, raw mode and the alternate
    /// screen are switched on the real terminal through crossterm.
    pub fn new(backend: B, input: Box<dyn InputSource>, manage_tty: bool) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            input,
            style: TuiStyle::default(),
            row: 0,
            col: 0,
            manage_tty,
            raw: false,
        })
    }

    /// The wrapped terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// The wrapped terminal, mutably (tests resize a `TestBackend` through it).
    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    /// Whether raw mode is on.
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    fn buffer(&mut self) -> &mut Buffer {
        self.terminal.current_buffer_mut()
    }

    fn reset_cells(&mut self, area: Rect) {
        let buf = self.buffer();
        let area = area.intersection(buf.area);
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                buf[(x, y)].reset();
            }
        }
    }
}

impl RatatuiBackend<ratatui::backend::CrosstermBackend<io::Stdout>> {
    /// Full-screen backend on stdout with crossterm key events.
    pub fn stdout() -> io::Result<Self> {
        let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
        Self::new(backend, Box::new(super::events::CrosstermInput), true)
    }
}

impl<B: Backend> TerminalBackend for RatatuiBackend<B> {
    fn name(&self) -> &'static str {
        "ratatui"
    }

    fn size(&mut self) -> io::Result<(u16, u16)> {
        self.terminal.autoresize()?;
        let area = self.terminal.current_buffer_mut().area;
        Ok((area.width, area.height))
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.row = row;
        self.col = col;
        Ok(())
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        self.style = to_tui_style(style);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let (row, col, style) = (self.row, self.col, self.style);
        let buf = self.buffer();
        let area = buf.area;
        if row >= area.height || col >= area.width {
            return Ok(());
        }
        let room = usize::from(area.width - col);
        let (x, _) = buf.set_stringn(col, row, text, room, style);
        self.col = x;
        Ok(())
    }

    fn clear_screen(&mut self, to_end_only: bool) -> io::Result<()> {
        if to_end_only {
            let area = self.buffer().area;
            let (row, col) = (self.row, self.col);
            self.reset_cells(Rect::new(col, row, area.width.saturating_sub(col), 1));
            let below = row.saturating_add(1);
            self.reset_cells(Rect::new(0, below, area.width, area.height.saturating_sub(below)));
        } else {
            // forces the next flush to repaint every cell
            self.terminal.clear()?;
            self.buffer().reset();
        }
        Ok(())
    }

    fn clear_to_eol(&mut self) -> io::Result<()> {
        let width = self.buffer().area.width;
        let (row, col) = (self.row, self.col);
        self.reset_cells(Rect::new(col, row, width.saturating_sub(col), 1));
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        if self.manage_tty && enabled != self.raw {
            use crossterm::terminal::{
                disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
            };
            use crossterm::ExecutableCommand;

            if enabled {
                enable_raw_mode()?;
                io::stdout().execute(EnterAlternateScreen)?;
            } else {
                io::stdout().execute(LeaveAlternateScreen)?;
                disable_raw_mode()?;
            }
        }
        self.raw = enabled;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            self.terminal.show_cursor()
        } else {
            self.terminal.hide_cursor()
        }
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<Input> {
        self.input.poll(timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.terminal.flush()?;
        self.terminal.swap_buffers();
        self.terminal.backend_mut().flush()
    }
}

impl<B: Backend> std::fmt::Debug for RatatuiBackend<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatatuiBackend")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("manage_tty", &self.manage_tty)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::events::ScriptedInput;
    use ratatui::backend::TestBackend;

    fn backend(width: u16, height: u16) -> RatatuiBackend<TestBackend> {
        let input = Box::new(ScriptedInput::new());
        RatatuiBackend::new(TestBackend::new(width, height), input, false).unwrap()
    }

    fn line(b: &RatatuiBackend<TestBackend>, y: u16) -> String {
        let buf = b.terminal().backend().buffer();
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_write_and_flush_reaches_screen() {
        let mut b = backend(10, 3);
        b.move_to(1, 2).unwrap();
        b.write_text("hello").unwrap();
        b.flush().unwrap();

        assert_eq!(line(&b, 1), "  hello   ");
    }

    #[test]
    fn test_write_is_clipped_at_edge() {
        let mut b = backend(6, 2);
        b.move_to(0, 3).unwrap();
        b.write_text("abcdef").unwrap();
        b.move_to(5, 0).unwrap();
        b.write_text("off screen").unwrap();
        b.flush().unwrap();

        assert_eq!(line(&b, 0), "   abc");
    }

    #[test]
    fn test_style_is_applied() {
        let mut b = backend(4, 1);
        let style = Style {
            bold: true,
            fg: Color::Red,
            ..Style::default()
        };
        b.set_style(style).unwrap();
        b.write_text("x").unwrap();
        b.flush().unwrap();

        let cell = &b.terminal().backend().buffer()[(0, 0)];
        assert_eq!(cell.fg, TuiColor::Red);
        assert!(cell.modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_clear_to_eol() {
        let mut b = backend(6, 1);
        b.write_text("abcdef").unwrap();
        b.move_to(0, 2).unwrap();
        b.clear_to_eol().unwrap();
        b.flush().unwrap();

        assert_eq!(line(&b, 0), "ab    ");
    }

    #[test]
    fn test_resize_is_picked_up() {
        let mut b = backend(20, 10);
        assert_eq!(b.size().unwrap(), (20, 10));
        b.terminal_mut().backend_mut().resize(30, 12);
        assert_eq!(b.size().unwrap(), (30, 12));
    }

    #[test]
    fn test_raw_mode_is_recorded_without_tty() {
        let mut b = backend(4, 1);
        b.set_raw_mode(true).unwrap();
        assert!(b.is_raw());
        b.set_raw_mode(false).unwrap();
        assert!(!b.is_raw());
    }

    #[test]
    fn test_to_tui_style_inverse() {
        let style = to_tui_style(Style {
            inverse: true,
            ..Style::default()
        });
        assert!(style.add_modifier.contains(Modifier::REVERSED));
    }
}
