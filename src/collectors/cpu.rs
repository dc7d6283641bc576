//! CPU tick collector.
//!
//! Parses the per-core `cpuN` lines of `/proc/stat`. Cores are keyed by
//! index; the synthetic aggregate ("CPU") is derived after each update as
//! the sum of per-core deltas divided by the number of cores.
//!
//! Each row also keeps a sparkline history of utilization buckets (0..=7,
//! one per 12.5% of use).

use super::{field_u64, read_file};
use crate::error::{MonitorError, Result};
use crate::ring_buffer::RingBuffer;
use crate::sampler::{counter_delta, BoxedSource, DeltaRecord, DeltaSampler, SnapshotSource};
use std::collections::BTreeMap;

/// Display name of the aggregate row.
pub const AGGREGATE_NAME: &str = "CPU";

/// Number of sparkline levels.
pub const SPARK_LEVELS: u8 = 8;

/// Scheduler tick counters for one core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    /// Time in user mode.
    pub user: u64,
    /// Time in kernel mode, including interrupt handling.
    pub system: u64,
    /// Time in niced user processes.
    pub nice: u64,
    /// Idle time, including I/O wait.
    pub idle: u64,
}

/// Utilization shares of one [`CpuTicks`] interval, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuPercent {
    /// Non-idle share.
    pub used: f64,
    /// User share.
    pub user: f64,
    /// System share.
    pub system: f64,
    /// Nice share.
    pub nice: f64,
    /// Idle share.
    pub idle: f64,
}

impl CpuTicks {
    /// Sum of all four counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.user + self.system + self.nice + self.idle
    }

    /// Field-wise sum.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            user: self.user + other.user,
            system: self.system + other.system,
            nice: self.nice + other.nice,
            idle: self.idle + other.idle,
        }
    }

    /// Field-wise integer division; `n == 0` yields zero ticks.
    #[must_use]
    pub fn divided_by(&self, n: u64) -> Self {
        if n == 0 {
            return Self::default();
        }
        Self {
            user: self.user / n,
            system: self.system / n,
            nice: self.nice / n,
            idle: self.idle / n,
        }
    }

    /// Shares of the interval, all zero when no ticks elapsed.
    #[must_use]
    pub fn percentages(&self) -> CpuPercent {
        let total = self.total();
        if total == 0 {
            return CpuPercent::default();
        }
        let pct = |v: u64| v as f64 * 100.0 / total as f64;
        CpuPercent {
            used: pct(self.user + self.system + self.nice),
            user: pct(self.user),
            system: pct(self.system),
            nice: pct(self.nice),
            idle: pct(self.idle),
        }
    }
}

impl DeltaRecord for CpuTicks {
    fn delta(&self, older: &Self) -> Self {
        Self {
            user: counter_delta(self.user, older.user),
            system: counter_delta(self.system, older.system),
            nice: counter_delta(self.nice, older.nice),
            idle: counter_delta(self.idle, older.idle),
        }
    }
}

/// Maps a utilization percentage to a sparkline level (0..=7).
#[must_use]
pub fn spark_bucket(percent: f64) -> u8 {
    if percent.is_nan() || percent <= 0.0 {
        return 0;
    }
    ((percent / 12.5).floor() as u64).min(u64::from(SPARK_LEVELS - 1)) as u8
}

/// Parses `/proc/stat` into per-core tick counters.
///
/// The aggregate `cpu ` line is ignored; it is rebuilt from the cores.
pub fn parse_proc_stat(content: &str) -> Result<Vec<(usize, CpuTicks)>> {
    let mut cores = Vec::new();
    for line in content.lines() {
        let Some(rest) = line.strip_prefix("cpu") else { continue };
        if rest.starts_with(' ') {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let Some(Ok(index)) = fields.first().map(|f| f.parse::<usize>()) else { continue };

        // cpuN user nice system idle iowait irq softirq steal
        let ticks = CpuTicks {
            user: field_u64(&fields, 1),
            nice: field_u64(&fields, 2),
            system: field_u64(&fields, 3) + field_u64(&fields, 6) + field_u64(&fields, 7),
            idle: field_u64(&fields, 4) + field_u64(&fields, 5),
        };
        cores.push((index, ticks));
    }
    if cores.is_empty() {
        return Err(MonitorError::collection("cpu", "no per-core lines in /proc/stat"));
    }
    Ok(cores)
}

/// Linux backend reading `/proc/stat`.
#[derive(Debug, Default)]
pub struct ProcStatSource;

impl SnapshotSource for ProcStatSource {
    type Key = usize;
    type Record = CpuTicks;

    fn id(&self) -> &'static str {
        "cpu"
    }

    fn read(&mut self) -> Result<Vec<(usize, CpuTicks)>> {
        parse_proc_stat(&read_file("cpu", "/proc/stat")?)
    }
}

/// Per-core tick sampler plus the derived aggregate and sparklines.
#[derive(Debug)]
pub struct CpuCollector {
    sampler: DeltaSampler<usize, CpuTicks>,
    aggregate_delta: CpuTicks,
    interval_ticks: u64,
    aggregate_history: RingBuffer<u8>,
    core_history: BTreeMap<usize, RingBuffer<u8>>,
    history_size: usize,
}

impl CpuCollector {
    /// Creates a collector over `source` keeping `history_size` sparkline samples.
    #[must_use]
    pub fn new(source: BoxedSource<usize, CpuTicks>, history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            sampler: DeltaSampler::new(source),
            aggregate_delta: CpuTicks::default(),
            interval_ticks: 0,
            aggregate_history: RingBuffer::new(history_size),
            core_history: BTreeMap::new(),
            history_size,
        }
    }

    /// Creates a collector reading `/proc/stat`.
    #[must_use]
    pub fn system(history_size: usize) -> Self {
        Self::new(Box::new(ProcStatSource), history_size)
    }

    /// Samples once and refreshes the aggregate and sparklines.
    ///
    /// Returns `false` if the backend failed; previous values stay in place.
    pub fn update(&mut self) -> bool {
        if !self.sampler.update() {
            return false;
        }

        let mut sum = CpuTicks::default();
        let mut cores = 0u64;
        for core in self.sampler.live_keys() {
            if let Some(delta) = self.sampler.delta_of(core) {
                sum = sum.add(delta);
                cores += 1;
            }
        }
        self.interval_ticks = sum.total();
        self.aggregate_delta = sum.divided_by(cores);

        // No history until a second read gives a real interval.
        if self.sampler.updates() > 1 {
            self.aggregate_history.push(spark_bucket(self.aggregate_delta.percentages().used));
            let live: Vec<usize> = self.sampler.live_keys().copied().collect();
            for core in live {
                let bucket =
                    self.sampler.delta_of(&core).map_or(0, |d| spark_bucket(d.percentages().used));
                let size = self.history_size;
                self.core_history.entry(core).or_insert_with(|| RingBuffer::new(size)).push(bucket);
            }
        }
        true
    }

    /// Number of cores observed in the latest read.
    pub fn core_count(&self) -> usize {
        self.sampler.live_keys().count()
    }

    /// Core indices observed in the latest read, ascending.
    pub fn cores(&self) -> impl Iterator<Item = usize> + '_ {
        self.sampler.live_keys().copied()
    }

    /// Tick delta of one core.
    pub fn core_delta(&self, core: usize) -> CpuTicks {
        self.sampler.delta_of(&core).copied().unwrap_or_default()
    }

    /// Aggregate delta: per-core deltas summed, then divided by core count.
    pub fn aggregate_delta(&self) -> CpuTicks {
        self.aggregate_delta
    }

    /// Total ticks elapsed across all cores during the last interval.
    pub fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Sparkline levels of the aggregate row, oldest first.
    pub fn aggregate_history(&self) -> &RingBuffer<u8> {
        &self.aggregate_history
    }

    /// Sparkline levels of one core, oldest first.
    pub fn core_history(&self, core: usize) -> Option<&RingBuffer<u8>> {
        self.core_history.get(&core)
    }

    /// Sparkline length.
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// The underlying sampler.
    pub fn sampler(&self) -> &DeltaSampler<usize, CpuTicks> {
        &self.sampler
    }
}
