//! Input sources for the terminal backends.
//!
//! - [`CrosstermInput`]: crossterm's event reader (used with ratatui)
//! - [`TtyInput`]: `poll(2)` on `/dev/tty` plus a SIGWINCH flag (raw backend)
//! - [`ScriptedInput`]: a queue of prepared events for tests

use super::backend::Input;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Something that can be waited on for keys and resize notifications.
pub trait InputSource {
    /// Waits up to `timeout` for one event.
    fn poll(&mut self, timeout: Duration) -> io::Result<Input>;
}

/// Maps a crossterm key event to an [`Input`].
///
/// Ctrl+letter becomes the matching control code.
#[must_use]
pub fn key_event_to_input(event: crossterm::event::KeyEvent) -> Input {
    use crossterm::event::{KeyCode, KeyModifiers};

    let control = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Char(c) if control && c.is_ascii_alphabetic() => {
            Input::Key(char::from(c.to_ascii_lowercase() as u8 - b'a' + 1))
        }
        KeyCode::Char(c) => Input::Key(c),
        _ => Input::Ignored,
    }
}

/// Events from crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Input> {
        use crossterm::event::{self, Event, KeyEventKind};

        if !event::poll(timeout)? {
            return Ok(Input::Timeout);
        }
        Ok(match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key_event_to_input(key),
            Event::Resize(_, _) => Input::Resize,
            _ => Input::Ignored,
        })
    }
}

/// Raw byte input from the controlling terminal.
#[cfg(unix)]
#[derive(Debug)]
pub struct TtyInput {
    tty: std::fs::File,
    resize: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(unix)]
impl TtyInput {
    /// Opens `/dev/tty`. `resize` is set by the SIGWINCH handler.
    pub fn open(resize: std::sync::Arc<std::sync::atomic::AtomicBool>) -> io::Result<Self> {
        let tty = std::fs::File::options().read(true).write(true).open("/dev/tty")?;
        Ok(Self { tty, resize })
    }

    fn readable(&self, timeout_ms: u16) -> nix::Result<bool> {
        use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
        use std::os::fd::AsFd;

        let mut fds = [PollFd::new(self.tty.as_fd(), PollFlags::POLLIN)];
        Ok(poll(&mut fds, PollTimeout::from(timeout_ms))? > 0)
    }

    fn read_byte(&self) -> io::Result<Option<u8>> {
        use std::io::Read;

        let mut buf = [0u8; 1];
        let n = (&self.tty).read(&mut buf)?;
        Ok((n == 1).then_some(buf[0]))
    }
}

#[cfg(unix)]
impl InputSource for TtyInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Input> {
        use std::sync::atomic::Ordering;

        if self.resize.swap(false, Ordering::SeqCst) {
            return Ok(Input::Resize);
        }

        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match self.readable(timeout_ms) {
            Ok(false) => Ok(Input::Timeout),
            Ok(true) => match self.read_byte()? {
                // escape sequence (arrow keys etc.): swallow the rest
                Some(0x1b) => {
                    while matches!(self.readable(0), Ok(true)) {
                        if self.read_byte()?.is_none() {
                            break;
                        }
                    }
                    Ok(Input::Ignored)
                }
                Some(byte) if byte.is_ascii() => Ok(Input::Key(char::from(byte))),
                _ => Ok(Input::Ignored),
            },
            // a signal interrupted the wait
            Err(nix::errno::Errno::EINTR) => {
                if self.resize.swap(false, Ordering::SeqCst) {
                    Ok(Input::Resize)
                } else {
                    Ok(Input::Ignored)
                }
            }
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

/// A shared queue of prepared events.
///
/// Clones share the queue, so a test can keep a handle and feed events
/// after the source has been moved into a backend. An empty queue behaves
/// like an idle keyboard: it sleeps for the timeout and reports
/// [`Input::Timeout`].
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    queue: Rc<RefCell<VecDeque<Input>>>,
}

impl ScriptedInput {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a key press.
    pub fn push_key(&self, key: char) {
        self.queue.borrow_mut().push_back(Input::Key(key));
    }

    /// Queues any event.
    pub fn push(&self, input: Input) {
        self.queue.borrow_mut().push_back(input);
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, timeout: Duration) -> io::Result<Input> {
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(input) => Ok(input),
            None => {
                std::thread::sleep(timeout);
                Ok(Input::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn test_key_event_to_input() {
        let plain = KeyEvent::new(KeyCode::Char('m'), KeyModifiers::NONE);
        assert_eq!(key_event_to_input(plain), Input::Key('m'));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_event_to_input(ctrl_c), Input::Key('\u{3}'));

        let ctrl_l = KeyEvent::new(KeyCode::Char('L'), KeyModifiers::CONTROL);
        assert_eq!(key_event_to_input(ctrl_l), Input::Key('\u{c}'));

        let arrow = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(key_event_to_input(arrow), Input::Ignored);
    }

    #[test]
    fn test_scripted_input_shares_queue() {
        let handle = ScriptedInput::new();
        let mut source = handle.clone();
        handle.push_key('q');
        handle.push(Input::Resize);

        assert_eq!(source.poll(Duration::ZERO).unwrap(), Input::Key('q'));
        assert_eq!(source.poll(Duration::ZERO).unwrap(), Input::Resize);
        assert_eq!(source.poll(Duration::from_millis(1)).unwrap(), Input::Timeout);
        assert_eq!(handle.pending(), 0);
    }
}
