//! Configuration for the dashboard.
//!
//! YAML file with precedence CLI > file > defaults. Every field carries a
//! serde default so a partial file (or an empty one) is valid.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Terminal backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Full-screen terminal library (ratatui over crossterm).
    #[default]
    Ratatui,
    /// Raw escape sequences written straight to the terminal.
    Ansi,
}

impl std::str::FromStr for BackendKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ratatui" | "tui" => Ok(Self::Ratatui),
            "ansi" | "raw" => Ok(Self::Ansi),
            other => Err(MonitorError::ConfigInvalid {
                key: "global.backend".to_string(),
                message: format!("unknown backend '{other}' (expected ratatui or ansi)"),
            }),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Refresh interval in milliseconds. Doubles as the key-read timeout.
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,

    /// Number of samples kept in each CPU sparkline.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Terminal backend.
    #[serde(default)]
    pub backend: BackendKind,
}

fn default_refresh_ms() -> u64 {
    1000
}
fn default_history_size() -> usize {
    20
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
            history_size: default_history_size(),
            backend: BackendKind::default(),
        }
    }
}

/// Size limits and adaptive condensing thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Minimum terminal width before the resize prompt replaces the dashboard.
    #[serde(default = "default_min_width")]
    pub min_width: u16,

    /// Minimum terminal height before the resize prompt replaces the dashboard.
    #[serde(default = "default_min_height")]
    pub min_height: u16,

    /// Below this height per-core CPU rows are condensed.
    #[serde(default = "default_condense_cpu_below")]
    pub condense_cpu_below: u16,

    /// Below this height every section is condensed.
    #[serde(default = "default_condense_all_below")]
    pub condense_all_below: u16,
}

fn default_min_width() -> u16 {
    99
}
fn default_min_height() -> u16 {
    24
}
fn default_condense_cpu_below() -> u16 {
    48
}
fn default_condense_all_below() -> u16 {
    32
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_width(),
            min_height: default_min_height(),
            condense_cpu_below: default_condense_cpu_below(),
            condense_all_below: default_condense_all_below(),
        }
    }
}

/// Initial per-section condensed toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CondenseConfig {
    /// CPU section.
    #[serde(default)]
    pub cpu: bool,
    /// Memory section.
    #[serde(default)]
    pub memory: bool,
    /// Virtual memory section.
    #[serde(default)]
    pub virtual_memory: bool,
    /// Disk section.
    #[serde(default)]
    pub disk: bool,
    /// Network section.
    #[serde(default)]
    pub network: bool,
    /// Process table.
    #[serde(default)]
    pub processes: bool,
    /// Every section, and no spacer lines.
    #[serde(default)]
    pub all: bool,
}

/// Log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level: error, warn, info, debug or trace.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file. Defaults to `<cache dir>/cctop/cctop.log`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global settings.
    #[serde(default)]
    pub global: GlobalConfig,

    /// Layout thresholds.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Initial condensed toggles.
    #[serde(default)]
    pub condense: CondenseConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            global: GlobalConfig::default(),
            layout: LayoutConfig::default(),
            condense: CondenseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location, `<config dir>/cctop/config.yaml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cctop").join("config.yaml"))
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .map_err(|_| MonitorError::ConfigNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(yaml).map_err(|e| {
            let line = e.location().map_or(0, |l| l.line());
            MonitorError::ConfigParse {
                line,
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(MonitorError::ConfigNotFound(_)) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unusable config file");
                Self::default()
            }
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.global.refresh_ms < 100 {
            return Err(invalid("global.refresh_ms", "must be at least 100"));
        }
        if self.global.history_size == 0 {
            return Err(invalid("global.history_size", "must be at least 1"));
        }
        if self.layout.condense_all_below > self.layout.condense_cpu_below {
            return Err(invalid(
                "layout.condense_all_below",
                "must not exceed layout.condense_cpu_below",
            ));
        }
        Ok(())
    }

    /// Returns the refresh interval as a Duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.global.refresh_ms)
    }
}

fn invalid(key: &str, message: &str) -> MonitorError {
    MonitorError::ConfigInvalid {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::new();

        assert_eq!(config.version, 1);
        assert_eq!(config.global.refresh_ms, 1000);
        assert_eq!(config.global.history_size, 20);
        assert_eq!(config.global.backend, BackendKind::Ratatui);
        assert_eq!(config.layout.min_width, 99);
        assert!(config.layout.condense_all_below <= config.layout.condense_cpu_below);
        assert_eq!(config.condense, CondenseConfig::default());
    }

    #[test]
    fn test_config_parse_empty_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.global.refresh_ms, 1000);
    }

    #[test]
    fn test_config_parse_full() {
        let yaml = r#"
version: 1
global:
  refresh_ms: 500
  history_size: 30
  backend: ansi
layout:
  min_width: 80
  min_height: 20
  condense_cpu_below: 40
  condense_all_below: 30
condense:
  network: true
logging:
  level: debug
  file: /tmp/cctop.log
"#;

        let config = Config::parse(yaml).unwrap();

        assert_eq!(config.global.refresh_ms, 500);
        assert_eq!(config.global.history_size, 30);
        assert_eq!(config.global.backend, BackendKind::Ansi);
        assert_eq!(config.layout.min_width, 80);
        assert!(config.condense.network);
        assert!(!config.condense.cpu);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/cctop.log")));
    }

    #[test]
    fn test_config_parse_error_includes_line() {
        let yaml = r#"
version: 1
global:
  refresh_ms: not_a_number
"#;

        let err = Config::parse(yaml).unwrap_err();
        assert!(matches!(err, MonitorError::ConfigParse { .. }));
        assert!(err.to_string().contains('4'), "Error should include line number: {err}");
    }

    #[test]
    fn test_config_rejects_fast_refresh() {
        let err = Config::parse("global:\n  refresh_ms: 10\n").unwrap_err();
        assert!(err.to_string().contains("refresh_ms"));
    }

    #[test]
    fn test_config_rejects_inverted_thresholds() {
        let yaml = "layout:\n  condense_cpu_below: 30\n  condense_all_below: 40\n";
        assert!(matches!(Config::parse(yaml), Err(MonitorError::ConfigInvalid { .. })));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("ANSI".parse::<BackendKind>().unwrap(), BackendKind::Ansi);
        assert_eq!("ratatui".parse::<BackendKind>().unwrap(), BackendKind::Ratatui);
        assert!("curses".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_config_refresh_interval() {
        let mut config = Config::new();
        config.global.refresh_ms = 250;
        assert_eq!(config.refresh_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "global:\n  history_size: 7").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.global.history_size, 7);
    }

    #[test]
    fn test_config_load_or_default() {
        let config = Config::load_or_default("/nonexistent/path");
        assert_eq!(config.version, 1);
    }
}
