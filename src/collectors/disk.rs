//! Block device I/O collector.
//!
//! Parses `/proc/diskstats`, keeping whole devices only: loop and ram
//! devices are skipped, as is any partition whose parent device is listed.

use super::{field_u64, read_file};
use crate::error::Result;
use crate::sampler::{counter_delta, BoxedSource, DeltaRecord, DeltaSampler, SnapshotSource};

/// `/proc/diskstats` sectors are always 512 bytes.
pub const SECTOR_SIZE: u64 = 512;

/// I/O counters for one block device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Completed reads.
    pub reads: u64,
    /// Completed writes.
    pub writes: u64,
    /// Bytes read.
    pub bytes_read: u64,
    /// Bytes written.
    pub bytes_written: u64,
}

impl DeltaRecord for DiskStats {
    fn delta(&self, older: &Self) -> Self {
        Self {
            reads: counter_delta(self.reads, older.reads),
            writes: counter_delta(self.writes, older.writes),
            bytes_read: counter_delta(self.bytes_read, older.bytes_read),
            bytes_written: counter_delta(self.bytes_written, older.bytes_written),
        }
    }
}

fn is_partition_of(name: &str, parent: &str) -> bool {
    let Some(suffix) = name.strip_prefix(parent) else { return false };
    let digits = suffix.strip_prefix('p').unwrap_or(suffix);
    !suffix.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parses `/proc/diskstats` into per-device counters.
pub fn parse_diskstats(content: &str) -> Vec<(String, DiskStats)> {
    let mut devices: Vec<(String, DiskStats)> = content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let name = *fields.get(2)?;
            if name.starts_with("loop") || name.starts_with("ram") {
                return None;
            }
            // major minor name reads merged sectors ms writes merged sectors ms ...
            Some((
                name.to_string(),
                DiskStats {
                    reads: field_u64(&fields, 3),
                    bytes_read: field_u64(&fields, 5) * SECTOR_SIZE,
                    writes: field_u64(&fields, 7),
                    bytes_written: field_u64(&fields, 9) * SECTOR_SIZE,
                },
            ))
        })
        .collect();

    let names: Vec<String> = devices.iter().map(|(n, _)| n.clone()).collect();
    devices.retain(|(name, _)| !names.iter().any(|parent| is_partition_of(name, parent)));
    devices
}

/// Linux backend reading `/proc/diskstats`.
#[derive(Debug, Default)]
pub struct ProcDiskstatsSource;

impl SnapshotSource for ProcDiskstatsSource {
    type Key = String;
    type Record = DiskStats;

    fn id(&self) -> &'static str {
        "disk"
    }

    fn read(&mut self) -> Result<Vec<(String, DiskStats)>> {
        Ok(parse_diskstats(&read_file("disk", "/proc/diskstats")?))
    }
}

/// Per-device I/O sampler.
#[derive(Debug)]
pub struct DiskCollector {
    sampler: DeltaSampler<String, DiskStats>,
}

impl DiskCollector {
    /// Creates a collector over `source`.
    #[must_use]
    pub fn new(source: BoxedSource<String, DiskStats>) -> Self {
        Self {
            sampler: DeltaSampler::new(source),
        }
    }

    /// Creates a collector reading `/proc/diskstats`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(ProcDiskstatsSource))
    }

    /// Samples once. Returns `false` if the backend failed.
    pub fn update(&mut self) -> bool {
        self.sampler.update()
    }

    /// Devices seen in the latest read with their delta and cumulative counters.
    pub fn devices(&self) -> impl Iterator<Item = (&str, DiskStats, DiskStats)> + '_ {
        self.sampler.live_keys().map(move |name| {
            let delta = self.sampler.delta_of(name).copied().unwrap_or_default();
            let current = self.sampler.current_of(name).copied().unwrap_or_default();
            (name.as_str(), delta, current)
        })
    }

    /// The underlying sampler.
    pub fn sampler(&self) -> &DeltaSampler<String, DiskStats> {
        &self.sampler
    }
}
