//! Memory and virtual memory collector.
//!
//! Reads `/proc/meminfo` (sizes, converted to pages) and `/proc/vmstat`
//! (paging and swap activity counters). A single aggregate record, so the
//! sampler is keyed by `()`.

use super::{field_u64, page_size, read_file};
use crate::error::{MonitorError, Result};
use crate::sampler::{counter_delta, BoxedSource, DeltaRecord, DeltaSampler, SnapshotSource};

const MIB: u64 = 1024 * 1024;

/// Page-granularity memory counters plus swap totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Physical memory, in pages.
    pub total_pages: u64,
    /// Free pages.
    pub free_pages: u64,
    /// Active pages.
    pub active_pages: u64,
    /// Inactive pages.
    pub inactive_pages: u64,
    /// Pages that cannot be reclaimed.
    pub wired_pages: u64,
    /// Pages held compressed.
    pub compressed_pages: u64,
    /// File-backed cache pages.
    pub cached_pages: u64,
    /// Cumulative page-ins.
    pub pageins: u64,
    /// Cumulative page-outs.
    pub pageouts: u64,
    /// Cumulative page faults.
    pub faults: u64,
    /// Cumulative pages swapped in.
    pub swapins: u64,
    /// Cumulative pages swapped out.
    pub swapouts: u64,
    /// Swap size in bytes.
    pub swap_total: u64,
    /// Swap in use, bytes.
    pub swap_used: u64,
    /// Swap free, bytes.
    pub swap_free: u64,
}

impl DeltaRecord for MemoryStats {
    fn delta(&self, older: &Self) -> Self {
        Self {
            total_pages: counter_delta(self.total_pages, older.total_pages),
            free_pages: counter_delta(self.free_pages, older.free_pages),
            active_pages: counter_delta(self.active_pages, older.active_pages),
            inactive_pages: counter_delta(self.inactive_pages, older.inactive_pages),
            wired_pages: counter_delta(self.wired_pages, older.wired_pages),
            compressed_pages: counter_delta(self.compressed_pages, older.compressed_pages),
            cached_pages: counter_delta(self.cached_pages, older.cached_pages),
            pageins: counter_delta(self.pageins, older.pageins),
            pageouts: counter_delta(self.pageouts, older.pageouts),
            faults: counter_delta(self.faults, older.faults),
            swapins: counter_delta(self.swapins, older.swapins),
            swapouts: counter_delta(self.swapouts, older.swapouts),
            swap_total: counter_delta(self.swap_total, older.swap_total),
            swap_used: counter_delta(self.swap_used, older.swap_used),
            swap_free: counter_delta(self.swap_free, older.swap_free),
        }
    }
}

/// Parses `/proc/meminfo` and `/proc/vmstat` contents.
pub fn parse_meminfo(meminfo: &str, vmstat: &str, page_size: u64) -> Result<MemoryStats> {
    let page_size = page_size.max(1);
    let kib = |key: &str| -> Option<u64> {
        meminfo.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse().ok()
        })
    };
    let pages = |key: &str| kib(key).map_or(0, |k| k * 1024 / page_size);

    let total_kib = kib("MemTotal")
        .ok_or_else(|| MonitorError::collection("memory", "MemTotal missing from /proc/meminfo"))?;

    let counter = |key: &str| -> u64 {
        vmstat
            .lines()
            .find_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                (fields.first() == Some(&key)).then(|| field_u64(&fields, 1))
            })
            .unwrap_or(0)
    };

    let swap_total = kib("SwapTotal").unwrap_or(0) * 1024;
    let swap_free = kib("SwapFree").unwrap_or(0) * 1024;

    Ok(MemoryStats {
        total_pages: total_kib * 1024 / page_size,
        free_pages: pages("MemFree"),
        active_pages: pages("Active"),
        inactive_pages: pages("Inactive"),
        wired_pages: pages("Unevictable"),
        compressed_pages: pages("Zswap"),
        cached_pages: pages("Cached"),
        pageins: counter("pgpgin"),
        pageouts: counter("pgpgout"),
        faults: counter("pgfault"),
        swapins: counter("pswpin"),
        swapouts: counter("pswpout"),
        swap_total,
        swap_used: swap_total.saturating_sub(swap_free),
        swap_free,
    })
}

/// Linux backend reading `/proc/meminfo` and `/proc/vmstat`.
#[derive(Debug)]
pub struct ProcMeminfoSource {
    page_size: u64,
}

impl ProcMeminfoSource {
    /// Creates a backend converting sizes with the system page size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: page_size(),
        }
    }
}

impl Default for ProcMeminfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSource for ProcMeminfoSource {
    type Key = ();
    type Record = MemoryStats;

    fn id(&self) -> &'static str {
        "memory"
    }

    fn read(&mut self) -> Result<Vec<((), MemoryStats)>> {
        let meminfo = read_file("memory", "/proc/meminfo")?;
        // vmstat only feeds activity counters; missing it is not fatal.
        let vmstat = std::fs::read_to_string("/proc/vmstat").unwrap_or_default();
        Ok(vec![((), parse_meminfo(&meminfo, &vmstat, self.page_size)?)])
    }
}

/// Memory sampler.
#[derive(Debug)]
pub struct MemoryCollector {
    sampler: DeltaSampler<(), MemoryStats>,
    page_size: u64,
}

impl MemoryCollector {
    /// Creates a collector over `source`; `page_size` converts pages to bytes.
    #[must_use]
    pub fn new(source: BoxedSource<(), MemoryStats>, page_size: u64) -> Self {
        Self {
            sampler: DeltaSampler::new(source),
            page_size: page_size.max(1),
        }
    }

    /// Creates a collector reading `/proc`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(ProcMeminfoSource::new()), page_size())
    }

    /// Samples once. Returns `false` if the backend failed.
    pub fn update(&mut self) -> bool {
        self.sampler.update()
    }

    /// Latest counters.
    pub fn current(&self) -> MemoryStats {
        self.sampler.current_of(&()).copied().unwrap_or_default()
    }

    /// Counter changes over the last interval.
    pub fn delta(&self) -> MemoryStats {
        self.sampler.delta_of(&()).copied().unwrap_or_default()
    }

    /// Page size in bytes.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Converts a page count to MiB.
    pub fn pages_to_mib(&self, pages: u64) -> u64 {
        pages * self.page_size / MIB
    }

    /// Bytes in use (total minus free).
    pub fn used_bytes(&self) -> u64 {
        let cur = self.current();
        cur.total_pages.saturating_sub(cur.free_pages) * self.page_size
    }

    /// Share of memory in use excluding cache, in percent.
    pub fn used_percent(&self) -> f64 {
        let cur = self.current();
        if cur.total_pages == 0 {
            return 0.0;
        }
        let used = cur.total_pages.saturating_sub(cur.free_pages).saturating_sub(cur.cached_pages);
        used as f64 * 100.0 / cur.total_pages as f64
    }
}
