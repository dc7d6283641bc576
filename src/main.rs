//! cctop: fixed-layout terminal dashboard
//!
//! CPU, memory, paging, disk, network and process activity on one screen,
//! refreshed once per interval. Sections condense on keypress or when the
//! terminal gets short.
//!
//! Run: `cctop -r 2000`

use anyhow::{Context, Result};
use cctop::app::{Dashboard, Sources};
use cctop::config::{BackendKind, Config};
use cctop::console::{Console, RatatuiBackend, TerminalBackend};
use cctop::logging;
use cctop::signals::{ExitReason, SignalFlags};
use clap::Parser;
use std::path::PathBuf;

/// cctop: fixed-layout terminal dashboard
#[derive(Parser, Debug)]
#[command(name = "cctop")]
#[command(author = "PAIML Team")]
#[command(version)]
#[command(
    about = "Fixed-layout terminal dashboard for CPU, memory, disk, network and processes",
    long_about = None
)]
struct Cli {
    /// Refresh rate in milliseconds
    #[arg(short, long)]
    refresh: Option<u64>,

    /// Terminal backend (ratatui or ansi)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Log at trace level
    #[arg(long)]
    trace: bool,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Render a single frame and exit
    #[arg(long)]
    once: bool,
}

fn main() {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    init_logging(&cli, &config);

    let signals = SignalFlags::register();
    match run(&cli, config, signals) {
        Ok(reason) => {
            if let Some(marker) = reason.and_then(ExitReason::marker) {
                println!("{marker}");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "dashboard failed");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// File (explicit path, else the default location) overlaid with CLI flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default_path().map_or_else(Config::default, Config::load_or_default),
    };

    if let Some(refresh) = cli.refresh {
        config.global.refresh_ms = refresh;
    }
    if let Some(backend) = cli.backend {
        config.global.backend = backend;
    }
    if let Some(path) = &cli.log_file {
        config.logging.file = Some(path.clone());
    }
    if cli.trace {
        config.logging.level = "trace".to_string();
    } else if cli.debug {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Logging is optional: any failure leaves it disabled.
fn init_logging(cli: &Cli, config: &Config) {
    let level = match logging::parse_level(&config.logging.level) {
        Ok(level) => level,
        Err(e) => {
            if cli.debug || cli.trace {
                eprintln!("logging disabled: {e}");
            }
            return;
        }
    };
    let Some(path) = config.logging.file.clone().or_else(logging::default_log_path) else {
        return;
    };
    if let Err(e) = logging::init(level, &path) {
        if cli.debug || cli.trace {
            eprintln!("logging disabled: {e}");
        }
    }
}

fn open_backend(kind: BackendKind, signals: &SignalFlags) -> Result<Box<dyn TerminalBackend>> {
    match kind {
        BackendKind::Ratatui => {
            let backend = RatatuiBackend::stdout().context("opening terminal")?;
            Ok(Box::new(backend))
        }
        #[cfg(unix)]
        BackendKind::Ansi => {
            let backend = cctop::console::AnsiBackend::stdout(signals.resize_flag())
                .context("opening /dev/tty")?;
            Ok(Box::new(backend))
        }
        #[cfg(not(unix))]
        BackendKind::Ansi => {
            let _ = signals;
            anyhow::bail!("the ansi backend needs a unix terminal")
        }
    }
}

/// Runs the dashboard. `None` means a `--once` frame was drawn.
fn run(cli: &Cli, config: Config, signals: SignalFlags) -> Result<Option<ExitReason>> {
    let backend = open_backend(config.global.backend, &signals)?;
    let history = config.global.history_size;
    let refresh_ms = config.global.refresh_ms;
    tracing::info!(backend = backend.name(), refresh_ms, history, "starting");

    let console = Console::new(backend);
    let mut dashboard = Dashboard::new(console, config, Sources::system(), signals);

    if cli.once {
        dashboard.run_once()?;
        return Ok(None);
    }
    Ok(Some(dashboard.run()?))
}
