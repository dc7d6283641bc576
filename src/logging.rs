//! File-backed diagnostic logging.
//!
//! The dashboard owns the terminal, so log records never go to stdout or
//! stderr. [`init`] installs a `tracing` subscriber writing plain text to a
//! file; without it every `tracing` macro is a no-op.

use crate::error::{MonitorError, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::Level;

/// Parses a level name (`error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(name: &str) -> Result<Level> {
    match name.to_ascii_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" | "warning" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        other => Err(MonitorError::ConfigInvalid {
            key: "logging.level".to_string(),
            message: format!("unknown level '{other}'"),
        }),
    }
}

/// Default log file, `<cache dir>/cctop/cctop.log`.
#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("cctop").join("cctop.log"))
}

/// Installs the global subscriber writing to `path` (appending).
///
/// # Errors
///
/// Fails if the file cannot be opened or a global subscriber already exists.
pub fn init(level: Level, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::options().create(true).append(true).open(path)?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| MonitorError::LoggingInit(e.to_string()))?;

    tracing::info!(path = %path.display(), %level, "logging initialized");
    Ok(())
}

/// Guard that logs how long a dashboard cycle took when dropped.
///
/// Cycles running past `budget` are reported at `warn`.
#[derive(Debug)]
pub struct CycleTimer {
    cycle: u64,
    start: Instant,
    budget: Duration,
}

impl CycleTimer {
    /// Starts timing cycle number `cycle`.
    #[must_use]
    pub fn start(cycle: u64, budget: Duration) -> Self {
        Self {
            cycle,
            start: Instant::now(),
            budget,
        }
    }

    /// Time elapsed since the timer started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stops the timer, logging the cycle, and returns its duration.
    pub fn finish(self) -> Duration {
        self.elapsed()
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if elapsed > self.budget {
            tracing::warn!(
                cycle = self.cycle,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "cycle overran its budget"
            );
        } else {
            let elapsed_us = elapsed.as_micros() as u64;
            tracing::debug!(cycle = self.cycle, elapsed_us, "cycle done");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert_eq!(parse_level("trace").unwrap(), Level::TRACE);
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn test_default_log_path_ends_with_file_name() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with("cctop/cctop.log"));
        }
    }

    #[test]
    fn test_cycle_timer_elapsed() {
        let timer = CycleTimer::start(1, Duration::from_secs(1));
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() >= Duration::from_millis(2));
    }
}
