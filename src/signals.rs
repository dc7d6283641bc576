//! Interrupt, terminate and resize signals.
//!
//! Handlers registered through `signal-hook` only store `true` into an
//! `AtomicBool`. The dashboard loop polls the flags between steps and runs
//! terminal cleanup itself, on the main thread, exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why the dashboard stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The quit key.
    Quit,
    /// SIGINT.
    Interrupted,
    /// SIGTERM.
    Terminated,
}

impl ExitReason {
    /// Text printed after the terminal is restored, if any.
    #[must_use]
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::Quit => None,
            Self::Interrupted => Some("^C"),
            Self::Terminated => Some("KILLED"),
        }
    }
}

/// Flags shared between the signal handlers and the dashboard loop.
#[derive(Debug, Clone, Default)]
pub struct SignalFlags {
    shutdown: Arc<AtomicBool>,
    interrupted: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    resize: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Flags with no OS handlers attached (tests, `--once`).
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Flags with SIGINT, SIGTERM and SIGWINCH handlers installed.
    ///
    /// Registration is best-effort; a failure is logged and that signal
    /// keeps its default disposition.
    #[must_use]
    pub fn register() -> Self {
        let flags = Self::default();
        flags.install();
        flags
    }

    #[cfg(unix)]
    fn install(&self) {
        use signal_hook::consts::{SIGINT, SIGTERM, SIGWINCH};

        let hooks = [
            ("SIGINT", SIGINT, &self.shutdown),
            ("SIGINT", SIGINT, &self.interrupted),
            ("SIGTERM", SIGTERM, &self.shutdown),
            ("SIGTERM", SIGTERM, &self.terminated),
            ("SIGWINCH", SIGWINCH, &self.resize),
        ];
        for (name, signal, flag) in hooks {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(flag)) {
                tracing::warn!(signal = name, error = %e, "failed to register signal handler");
            }
        }
        tracing::debug!("signal handlers registered");
    }

    #[cfg(not(unix))]
    fn install(&self) {
        use signal_hook::consts::{SIGINT, SIGTERM};

        for (name, signal, flag) in [
            ("SIGINT", SIGINT, &self.interrupted),
            ("SIGTERM", SIGTERM, &self.terminated),
        ] {
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(flag)) {
                tracing::warn!(signal = name, error = %e, "failed to register signal handler");
            }
            if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&self.shutdown)) {
                tracing::warn!(signal = name, error = %e, "failed to register signal handler");
            }
        }
    }

    /// Whether an interrupt or terminate signal has arrived.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// The shutdown flag, used as the cancellation token for key reads.
    pub fn shutdown_flag(&self) -> &AtomicBool {
        &self.shutdown
    }

    /// The resize flag, shared with the raw tty input source.
    pub fn resize_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.resize)
    }

    /// Clears and returns the resize flag.
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::SeqCst)
    }

    /// Simulates SIGINT.
    pub fn raise_interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Simulates SIGTERM.
    pub fn raise_terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Simulates SIGWINCH.
    pub fn raise_resize(&self) {
        self.resize.store(true, Ordering::SeqCst);
    }

    /// Which signal asked for shutdown, if any. Terminate wins over
    /// interrupt when both arrived.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        if self.terminated.load(Ordering::SeqCst) {
            Some(ExitReason::Terminated)
        } else if self.interrupted.load(Ordering::SeqCst) || self.shutdown_requested() {
            Some(ExitReason::Interrupted)
        } else {
            None
        }
    }
}
