//! Terminal backend abstraction.
//!
//! A backend knows how to put styled text at a position, clear regions,
//! toggle raw mode and cursor visibility, and wait for input. It does not
//! track layout; [`Console`](super::Console) does that and drives the
//! backend one primitive at a time.

use std::io;
use std::time::Duration;

/// The eight ANSI colors plus the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// Terminal default.
    #[default]
    Default,
    /// Black.
    Black,
    /// Red.
    Red,
    /// Green.
    Green,
    /// Yellow.
    Yellow,
    /// Blue.
    Blue,
    /// Magenta.
    Magenta,
    /// Cyan.
    Cyan,
    /// White.
    White,
}

impl Color {
    /// ANSI color index (0..=7), `None` for the default color.
    #[must_use]
    pub fn ansi_index(self) -> Option<u8> {
        match self {
            Self::Default => None,
            Self::Black => Some(0),
            Self::Red => Some(1),
            Self::Green => Some(2),
            Self::Yellow => Some(3),
            Self::Blue => Some(4),
            Self::Magenta => Some(5),
            Self::Cyan => Some(6),
            Self::White => Some(7),
        }
    }
}

/// Text attributes and colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Style {
    /// Bold.
    pub bold: bool,
    /// Underline.
    pub underline: bool,
    /// Blink.
    pub blink: bool,
    /// Foreground and background swapped.
    pub inverse: bool,
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
}

/// Result of waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A character key, control keys as their ASCII code (`^C` = `'\u{3}'`).
    Key(char),
    /// The terminal changed size.
    Resize,
    /// Something arrived that is not a character key.
    Ignored,
    /// Nothing arrived before the timeout.
    Timeout,
}

/// Output and input primitives of one terminal.
///
/// Rows and columns are zero-based. Text handed to [`write_text`] has
/// already been clipped to the terminal width by the caller.
///
/// [`write_text`]: TerminalBackend::write_text
pub trait TerminalBackend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Current size as `(width, height)`.
    fn size(&mut self) -> io::Result<(u16, u16)>;

    /// Moves the output position.
    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()>;

    /// Applies `style` to subsequent text.
    fn set_style(&mut self, style: Style) -> io::Result<()>;

    /// Writes text at the output position and advances it.
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    /// Clears the whole screen, or from the output position to the end.
    fn clear_screen(&mut self, to_end_only: bool) -> io::Result<()>;

    /// Clears from the output position to the end of the line.
    fn clear_to_eol(&mut self) -> io::Result<()>;

    /// Enters or leaves raw (non-canonical, no echo) input mode.
    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()>;

    /// Shows or hides the cursor.
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Waits up to `timeout` for input.
    fn poll_input(&mut self, timeout: Duration) -> io::Result<Input>;

    /// Pushes buffered output to the terminal.
    fn flush(&mut self) -> io::Result<()>;
}

impl<T: TerminalBackend + ?Sized> TerminalBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn size(&mut self) -> io::Result<(u16, u16)> {
        (**self).size()
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        (**self).move_to(row, col)
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        (**self).set_style(style)
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        (**self).write_text(text)
    }

    fn clear_screen(&mut self, to_end_only: bool) -> io::Result<()> {
        (**self).clear_screen(to_end_only)
    }

    fn clear_to_eol(&mut self) -> io::Result<()> {
        (**self).clear_to_eol()
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        (**self).set_raw_mode(enabled)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        (**self).set_cursor_visible(visible)
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<Input> {
        (**self).poll_input(timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}
