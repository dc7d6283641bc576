//! Backend emitting raw ANSI/VT100 control sequences.
//!
//! Output goes to any `io::Write` (stdout in production, a `Vec<u8>` in
//! tests) through a `BufWriter`-like staging buffer flushed once per frame.
//! When a [`TtyInput`](super::events::TtyInput) is attached, raw mode is set
//! with termios on `/dev/tty` and the size comes from `TIOCGWINSZ`.

use super::backend::{Input, Style, TerminalBackend};
use super::events::InputSource;
use std::io::{self, Write};
use std::time::Duration;

const CSI: &str = "\x1b[";

/// Builds the SGR sequence selecting exactly `style`.
#[must_use]
pub fn sgr(style: Style) -> String {
    let mut codes = vec!["0".to_string()];
    if style.bold {
        codes.push("1".into());
    }
    if style.underline {
        codes.push("4".into());
    }
    if style.blink {
        codes.push("5".into());
    }
    if style.inverse {
        codes.push("7".into());
    }
    if let Some(i) = style.fg.ansi_index() {
        codes.push((30 + i).to_string());
    }
    if let Some(i) = style.bg.ansi_index() {
        codes.push((40 + i).to_string());
    }
    format!("{CSI}{}m", codes.join(";"))
}

/// Raw terminal state owned by the ANSI backend.
#[cfg(unix)]
struct RawTty {
    device: std::fs::File,
    saved: Option<nix::sys::termios::Termios>,
}

#[cfg(unix)]
impl RawTty {
    fn set_raw(&mut self, enabled: bool) -> io::Result<()> {
        use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices};

        let device = &self.device;
        if enabled {
            if self.saved.is_some() {
                return Ok(());
            }
            let original = tcgetattr(device).map_err(io::Error::from)?;
            let mut raw = original.clone();
            // keep ISIG so ^C still raises SIGINT
            raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
            raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
            raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
            tcsetattr(device, SetArg::TCSANOW, &raw).map_err(io::Error::from)?;
            self.saved = Some(original);
        } else if let Some(original) = self.saved.take() {
            tcsetattr(device, SetArg::TCSANOW, &original).map_err(io::Error::from)?;
        }
        Ok(())
    }

    #[allow(unsafe_code)]
    fn size(&self) -> io::Result<(u16, u16)> {
        use std::os::fd::AsRawFd;

        let mut ws = libc::winsize { ws_row: 0, ws_col: 0, ws_xpixel: 0, ws_ypixel: 0 };
        // SAFETY: TIOCGWINSZ writes one winsize into the pointed-to struct,
        // which lives for the duration of the call.
        let rc = unsafe { libc::ioctl(self.device.as_raw_fd(), libc::TIOCGWINSZ, &mut ws) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok((ws.ws_col, ws.ws_row))
    }
}

/// A [`TerminalBackend`] writing escape sequences to `W`.
pub struct AnsiBackend<W: Write> {
    out: W,
    staged: Vec<u8>,
    input: Box<dyn InputSource>,
    #[cfg(unix)]
    tty: Option<RawTty>,
    fixed_size: (u16, u16),
    style: Option<Style>,
    raw: bool,
}

impl<W: Write> AnsiBackend<W> {
    /// A detached backend: fixed `size`, input from `input`, raw mode only recorded.
    pub fn detached(out: W, input: Box<dyn InputSource>, size: (u16, u16)) -> Self {
        Self {
            out,
            staged: Vec::with_capacity(16 * 1024),
            input,
            #[cfg(unix)]
            tty: None,
            fixed_size: size,
            style: None,
            raw: false,
        }
    }

    /// The output sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Whether raw mode is on.
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    fn emit(&mut self, seq: &str) {
        self.staged.extend_from_slice(seq.as_bytes());
    }
}

#[cfg(unix)]
impl AnsiBackend<io::Stdout> {
    /// Backend on stdout driven by `/dev/tty`. `resize` is the SIGWINCH flag.
    pub fn stdout(resize: std::sync::Arc<std::sync::atomic::AtomicBool>) -> io::Result<Self> {
        let input = super::events::TtyInput::open(resize)?;
        let device = std::fs::File::options().read(true).write(true).open("/dev/tty")?;
        let mut backend = Self::detached(io::stdout(), Box::new(input), (80, 24));
        backend.tty = Some(RawTty {
            device,
            saved: None,
        });
        Ok(backend)
    }
}

impl<W: Write> TerminalBackend for AnsiBackend<W> {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn size(&mut self) -> io::Result<(u16, u16)> {
        #[cfg(unix)]
        if let Some(tty) = &self.tty {
            return tty.size();
        }
        Ok(self.fixed_size)
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        let seq = format!("{CSI}{};{}H", u32::from(row) + 1, u32::from(col) + 1);
        self.emit(&seq);
        Ok(())
    }

    fn set_style(&mut self, style: Style) -> io::Result<()> {
        if self.style != Some(style) {
            let seq = sgr(style);
            self.emit(&seq);
            self.style = Some(style);
        }
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.staged.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn clear_screen(&mut self, to_end_only: bool) -> io::Result<()> {
        self.emit(if to_end_only { "\x1b[0J" } else { "\x1b[2J" });
        Ok(())
    }

    fn clear_to_eol(&mut self) -> io::Result<()> {
        self.emit("\x1b[0K");
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        #[cfg(unix)]
        if let Some(tty) = &mut self.tty {
            tty.set_raw(enabled)?;
        }
        self.raw = enabled;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.emit(if visible { "\x1b[?25h" } else { "\x1b[?25l" });
        Ok(())
    }

    fn poll_input(&mut self, timeout: Duration) -> io::Result<Input> {
        self.input.poll(timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.staged.is_empty() {
            self.out.write_all(&self.staged)?;
            self.staged.clear();
        }
        self.out.flush()
    }
}

impl<W: Write> std::fmt::Debug for AnsiBackend<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsiBackend")
            .field("fixed_size", &self.fixed_size)
            .field("staged", &self.staged.len())
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}
