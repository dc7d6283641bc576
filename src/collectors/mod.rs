//! Metric collectors.
//!
//! Each collector pairs a Linux backend (reading `/proc` and `/sys`) with the
//! bookkeeping the dashboard renders from:
//!
//! - **CPU**, **memory**, **disk**, **network**:
//!   [`DeltaSampler`](crate::sampler::DeltaSampler) instantiations
//! - **Processes**: a generation-stamped [`ProcessTable`]
//! - **Platform**: host identity, uptime, load average and battery
//!
//! Backends are injected, so tests drive collectors from scripted sources.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod platform;
pub mod process;

pub use cpu::{CpuCollector, CpuTicks, ProcStatSource};
pub use disk::{DiskCollector, DiskStats, ProcDiskstatsSource};
pub use memory::{MemoryCollector, MemoryStats, ProcMeminfoSource};
pub use network::{NetStats, NetworkCollector, ProcNetDevSource};
pub use platform::{
    BatteryState, PlatformCollector, PlatformInfo, PlatformSource, PowerSupply,
    ProcPlatformSource, StaticPlatformSource,
};
pub use process::{
    NameCache, NameLookup, ProcessRecord, ProcessSample, ProcessSource, ProcessTable,
    ProcfsProcessSource, ScriptedProcessSource, SystemNames,
};

use crate::error::{MonitorError, Result};
use std::path::Path;

/// Reads a whole `/proc` or `/sys` file, tagging failures with `collector`.
pub(crate) fn read_file(collector: &'static str, path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map_err(|e| MonitorError::collection(collector, format!("{}: {e}", path.display())))
}

/// Parses the `idx`-th whitespace field of a line as `u64`, 0 when absent.
pub(crate) fn field_u64(fields: &[&str], idx: usize) -> u64 {
    fields.get(idx).and_then(|f| f.parse().ok()).unwrap_or(0)
}

/// System page size in bytes. Constant for the life of the process.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn page_size() -> u64 {
    // SAFETY: sysconf takes no pointers and has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

/// System page size in bytes.
#[cfg(not(unix))]
pub fn page_size() -> u64 {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_u64() {
        let fields = ["12", "x", "7"];
        assert_eq!(field_u64(&fields, 0), 12);
        assert_eq!(field_u64(&fields, 1), 0);
        assert_eq!(field_u64(&fields, 9), 0);
    }

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 512);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_read_file_error_names_collector() {
        let err = read_file("disk", "/nonexistent/diskstats").unwrap_err();
        let display = err.to_string();
        assert!(display.contains("disk"));
        assert!(display.contains("/nonexistent/diskstats"));
    }
}
