//! # cctop
//!
//! Fixed-layout terminal dashboard for CPU, memory, paging, disk, network
//! and process activity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     app::Dashboard                      │
//! ├─────────────────────────────────────────────────────────┤
//! │  collectors          panels            input / signals  │
//! │  ├── cpu             ├── header        ├── Options      │
//! │  ├── memory          ├── cpu           └── SignalFlags  │
//! │  ├── disk            ├── memory                         │
//! │  ├── network         ├── disk                           │
//! │  ├── process         ├── network                        │
//! │  └── platform        ├── process                        │
//! │                      └── help                           │
//! ├─────────────────────────────────────────────────────────┤
//! │  console::Console over a TerminalBackend                │
//! │  (ratatui, raw ANSI, or an in-memory recording)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Every counter-based metric goes through [`sampler::DeltaSampler`]: the
//! previous and current snapshot of each entity, and the non-negative
//! difference between them. Processes are kept in a generation-stamped
//! [`collectors::ProcessTable`] instead, so exited pids drop out.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cctop::prelude::*;
//!
//! let console = Console::new(RatatuiBackend::stdout()?);
//! let signals = SignalFlags::register();
//! let mut dashboard = Dashboard::new(console, Config::default(), Sources::system(), signals);
//! dashboard.run()?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

/// Dashboard controller: cycle loop, modes and layout.
pub mod app;

/// Metric collectors and their Linux backends.
pub mod collectors;

/// YAML configuration.
pub mod config;

/// Render surface and terminal backends.
pub mod console;

/// Error types.
pub mod error;

/// Display options and key dispatch.
pub mod input;

/// File-backed logging.
pub mod logging;

/// Section renderers.
pub mod panels;

/// Fixed-capacity history buffer.
pub mod ring_buffer;

/// Snapshot/delta bookkeeping shared by the counter collectors.
pub mod sampler;

/// Signal flags.
pub mod signals;

pub use error::{MonitorError, Result};

/// Commonly used types.
///
/// ```rust,ignore
/// use cctop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{Dashboard, Flow, Mode, Sources};
    pub use crate::config::{BackendKind, Config};
    pub use crate::console::{Console, RatatuiBackend, RecordingBackend, TerminalBackend};
    pub use crate::error::{MonitorError, Result};
    pub use crate::input::{Action, Options, Section};
    pub use crate::signals::{ExitReason, SignalFlags};
}
