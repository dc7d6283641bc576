//! Process table.
//!
//! Pid-keyed records with a generation counter. Every update stamps the
//! records it refreshes with the current generation; anything left with an
//! older stamp after the pass has exited and is purged.
//!
//! CPU% is the process's tick delta over the ticks elapsed on all cores in
//! the same interval, so 100% means the whole machine.

use super::{field_u64, page_size, read_file};
use crate::error::{MonitorError, Result};
use crate::sampler::counter_delta;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// One backend reading of a process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSample {
    /// Process id.
    pub pid: u32,
    /// Parent process id.
    pub ppid: u32,
    /// Real user id.
    pub uid: u32,
    /// Real group id.
    pub gid: u32,
    /// Command name.
    pub name: String,
    /// Scheduler state (`R`, `S`, `Z`, ...).
    pub state: char,
    /// Start time in ticks since boot.
    pub start_time: u64,
    /// Virtual size in bytes.
    pub virtual_size: u64,
    /// Resident set size in bytes.
    pub resident_size: u64,
    /// Cumulative user ticks.
    pub total_user: u64,
    /// Cumulative system ticks.
    pub total_system: u64,
}

/// A tracked process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    /// Latest backend reading.
    pub sample: ProcessSample,
    /// User ticks during the last interval.
    pub delta_user: u64,
    /// System ticks during the last interval.
    pub delta_system: u64,
    /// Share of all CPU time during the last interval, in percent.
    pub cpu_percent: f64,
    /// Generation in which the record was last refreshed.
    pub touched: u64,
}

impl ProcessRecord {
    /// Process id.
    pub fn pid(&self) -> u32 {
        self.sample.pid
    }
}

/// Backend for the process table.
pub trait ProcessSource {
    /// Identifier used in logs.
    fn id(&self) -> &'static str {
        "process"
    }

    /// Lists every live pid.
    fn list_pids(&mut self) -> Result<Vec<u32>>;

    /// Reads one process. [`MonitorError::ProcessNotFound`] when it exited.
    fn sample(&mut self, pid: u32) -> Result<ProcessSample>;
}

// ============================================================================
// Linux backend
// ============================================================================

/// Parses `/proc/<pid>/stat`. The uid/gid fields are left at zero.
pub fn parse_pid_stat(pid: u32, content: &str, page_size: u64) -> Result<ProcessSample> {
    // comm may contain spaces and parentheses; it ends at the last ')'.
    let bounds = content.find('(').zip(content.rfind(')'));
    let Some((open, close)) = bounds.filter(|(open, close)| open < close) else {
        return Err(MonitorError::collection("process", format!("malformed stat for pid {pid}")));
    };
    let name = content[open + 1..close].to_string();
    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if fields.len() < 22 {
        return Err(MonitorError::collection("process", format!("short stat for pid {pid}")));
    }

    // Offsets relative to field 3 (state) of proc(5).
    Ok(ProcessSample {
        pid,
        ppid: field_u64(&fields, 1) as u32,
        name,
        state: fields[0].chars().next().unwrap_or('?'),
        total_user: field_u64(&fields, 11),
        total_system: field_u64(&fields, 12),
        start_time: field_u64(&fields, 19),
        virtual_size: field_u64(&fields, 20),
        resident_size: field_u64(&fields, 21) * page_size,
        ..ProcessSample::default()
    })
}

/// Extracts the real uid and gid from `/proc/<pid>/status`.
pub fn parse_pid_status(content: &str) -> (u32, u32) {
    let id = |key: &str| {
        content
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    (id("Uid:"), id("Gid:"))
}

/// Linux backend reading `/proc/<pid>/{stat,status}`.
#[derive(Debug)]
pub struct ProcfsProcessSource {
    page_size: u64,
}

impl ProcfsProcessSource {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: page_size(),
        }
    }
}

impl Default for ProcfsProcessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for ProcfsProcessSource {
    fn list_pids(&mut self) -> Result<Vec<u32>> {
        let entries = std::fs::read_dir("/proc")
            .map_err(|e| MonitorError::collection("process", format!("/proc: {e}")))?;
        Ok(entries
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
            .collect())
    }

    fn sample(&mut self, pid: u32) -> Result<ProcessSample> {
        let stat = read_file("process", format!("/proc/{pid}/stat"))
            .map_err(|_| MonitorError::ProcessNotFound(pid))?;
        let mut sample = parse_pid_stat(pid, &stat, self.page_size)?;
        let status = read_file("process", format!("/proc/{pid}/status"))
            .map_err(|_| MonitorError::ProcessNotFound(pid))?;
        (sample.uid, sample.gid) = parse_pid_status(&status);
        Ok(sample)
    }
}

// ============================================================================
// Scripted backend
// ============================================================================

/// One scripted process-list frame.
#[derive(Debug, Clone, Default)]
struct ProcessFrame {
    samples: Vec<ProcessSample>,
    /// Listed but gone by the time they are sampled.
    exited: Vec<u32>,
}

/// A process backend replaying prepared frames; the last frame repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProcessSource {
    frames: VecDeque<ProcessFrame>,
    active: ProcessFrame,
}

impl ScriptedProcessSource {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame of live processes.
    #[must_use]
    pub fn frame(mut self, samples: Vec<ProcessSample>) -> Self {
        self.frames.push_back(ProcessFrame {
            samples,
            exited: Vec::new(),
        });
        self
    }

    /// Appends a frame where `exited` pids are listed but vanish before sampling.
    #[must_use]
    pub fn frame_with_exits(mut self, samples: Vec<ProcessSample>, exited: Vec<u32>) -> Self {
        self.frames.push_back(ProcessFrame { samples, exited });
        self
    }
}

impl ProcessSource for ScriptedProcessSource {
    fn list_pids(&mut self) -> Result<Vec<u32>> {
        if let Some(frame) = self.frames.pop_front() {
            self.active = frame;
        }
        let mut pids: Vec<u32> = self.active.samples.iter().map(|s| s.pid).collect();
        pids.extend(&self.active.exited);
        Ok(pids)
    }

    fn sample(&mut self, pid: u32) -> Result<ProcessSample> {
        self.active
            .samples
            .iter()
            .find(|s| s.pid == pid)
            .cloned()
            .ok_or(MonitorError::ProcessNotFound(pid))
    }
}

// ============================================================================
// Table
// ============================================================================

/// Generation-stamped pid → record map.
pub struct ProcessTable {
    source: Box<dyn ProcessSource>,
    records: BTreeMap<u32, ProcessRecord>,
    generation: u64,
    own_pid: u32,
}

impl ProcessTable {
    /// Creates an empty table over `source`.
    #[must_use]
    pub fn new(source: Box<dyn ProcessSource>) -> Self {
        Self {
            source,
            records: BTreeMap::new(),
            generation: 0,
            own_pid: std::process::id(),
        }
    }

    /// Creates a table reading `/proc`.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(ProcfsProcessSource::new()))
    }

    /// Refreshes every process.
    ///
    /// `interval_ticks` is the number of scheduler ticks elapsed on all cores
    /// since the previous update. Processes that fail to sample are skipped
    /// for this cycle and, unless seen again, purged. Returns `false` if the
    /// pid list itself could not be read; records are then left untouched.
    pub fn update(&mut self, interval_ticks: u64) -> bool {
        self.generation += 1;
        let generation = self.generation;

        let pids = match self.source.list_pids() {
            Ok(pids) => pids,
            Err(e) => {
                tracing::warn!(
                    collector = self.source.id(),
                    error = %e,
                    "pid listing failed, keeping previous table"
                );
                return false;
            }
        };

        for pid in pids {
            let sample = match self.source.sample(pid) {
                Ok(sample) => sample,
                Err(e) => {
                    tracing::trace!(pid, error = %e, "process skipped this cycle");
                    continue;
                }
            };

            let (delta_user, delta_system) = match self.records.get(&pid) {
                // same pid, same process
                Some(old) if old.sample.start_time == sample.start_time => (
                    counter_delta(sample.total_user, old.sample.total_user),
                    counter_delta(sample.total_system, old.sample.total_system),
                ),
                _ => (0, 0),
            };
            let cpu_percent = if interval_ticks == 0 {
                0.0
            } else {
                (delta_user + delta_system) as f64 * 100.0 / interval_ticks as f64
            };

            self.records.insert(
                pid,
                ProcessRecord {
                    sample,
                    delta_user,
                    delta_system,
                    cpu_percent,
                    touched: generation,
                },
            );
        }

        let before = self.records.len();
        self.records.retain(|_, record| record.touched == generation);
        let purged = before - self.records.len();
        if purged > 0 {
            tracing::debug!(purged, generation, "purged exited processes");
        }
        true
    }

    /// Busiest processes first, ties in ascending pid order, at most `limit`.
    pub fn view(&self, limit: usize) -> Vec<&ProcessRecord> {
        let mut rows: Vec<&ProcessRecord> = self.records.values().collect();
        rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        rows.truncate(limit);
        rows
    }

    /// Record for `pid`.
    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    /// Number of tracked processes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pid of the dashboard itself, rendered highlighted.
    pub fn own_pid(&self) -> u32 {
        self.own_pid
    }

    /// Overrides the pid treated as the dashboard's own.
    pub fn set_own_pid(&mut self, pid: u32) {
        self.own_pid = pid;
    }
}

impl fmt::Debug for ProcessTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessTable")
            .field("source", &self.source.id())
            .field("processes", &self.records.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// User and group names
// ============================================================================

/// Reverse lookup of user and group ids.
pub trait NameLookup {
    /// User name for `uid`.
    fn user(&self, uid: u32) -> Option<String>;
    /// Group name for `gid`.
    fn group(&self, gid: u32) -> Option<String>;
}

/// Lookup through the system user and group databases.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNames;

#[cfg(unix)]
impl NameLookup for SystemNames {
    fn user(&self, uid: u32) -> Option<String> {
        nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid)).ok().flatten().map(|u| u.name)
    }

    fn group(&self, gid: u32) -> Option<String> {
        nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid)).ok().flatten().map(|g| g.name)
    }
}

#[cfg(not(unix))]
impl NameLookup for SystemNames {
    fn user(&self, _uid: u32) -> Option<String> {
        None
    }

    fn group(&self, _gid: u32) -> Option<String> {
        None
    }
}

/// Memoizing wrapper over a [`NameLookup`]; misses fall back to the number.
pub struct NameCache {
    lookup: Box<dyn NameLookup>,
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl NameCache {
    /// Creates an empty cache over `lookup`.
    #[must_use]
    pub fn new(lookup: Box<dyn NameLookup>) -> Self {
        Self {
            lookup,
            users: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    /// Creates a cache over the system databases.
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SystemNames))
    }

    /// User name for `uid`.
    pub fn user(&mut self, uid: u32) -> &str {
        let lookup = &self.lookup;
        self.users
            .entry(uid)
            .or_insert_with(|| lookup.user(uid).unwrap_or_else(|| uid.to_string()))
    }

    /// Group name for `gid`.
    pub fn group(&mut self, gid: u32) -> &str {
        let lookup = &self.lookup;
        self.groups
            .entry(gid)
            .or_insert_with(|| lookup.group(gid).unwrap_or_else(|| gid.to_string()))
    }
}

impl fmt::Debug for NameCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameCache")
            .field("users", &self.users.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn proc_sample(pid: u32, user: u64, system: u64) -> ProcessSample {
        ProcessSample {
            pid,
            name: format!("p{pid}"),
            total_user: user,
            total_system: system,
            ..ProcessSample::default()
        }
    }

    #[test]
    fn test_parse_pid_stat() {
        let stat = "4242 (my (odd) prog) S 1 4242 4242 0 -1 4194560 100 0 0 0 \
                    37 12 0 0 20 0 1 0 98765 123456789 300 18446744073709551615";
        let sample = parse_pid_stat(4242, stat, 4096).unwrap();
        assert_eq!(sample.name, "my (odd) prog");
        assert_eq!(sample.state, 'S');
        assert_eq!(sample.ppid, 1);
        assert_eq!(sample.total_user, 37);
        assert_eq!(sample.total_system, 12);
        assert_eq!(sample.start_time, 98765);
        assert_eq!(sample.virtual_size, 123_456_789);
        assert_eq!(sample.resident_size, 300 * 4096);
    }

    #[test]
    fn test_parse_pid_stat_rejects_garbage() {
        assert!(parse_pid_stat(1, "nonsense", 4096).is_err());
        assert!(parse_pid_stat(1, "1 (x) S 0", 4096).is_err());
        // closing parenthesis before the opening one
        assert!(matches!(
            parse_pid_stat(7, "7 ) S (x", 4096),
            Err(MonitorError::CollectionFailed { .. })
        ));
    }

    #[test]
    fn test_parse_pid_status() {
        let status = "Name:\tbash\nUid:\t1000\t1000\t1000\t1000\nGid:\t100\t100\t100\t100\n";
        assert_eq!(parse_pid_status(status), (1000, 100));
    }

    #[test]
    fn test_churn_purges_and_first_sighting_is_zero() {
        let source = ScriptedProcessSource::new()
            .frame(vec![proc_sample(1, 10, 10), proc_sample(2, 10, 10), proc_sample(3, 10, 10)])
            .frame(vec![proc_sample(2, 20, 15), proc_sample(3, 10, 10), proc_sample(4, 500, 500)]);
        let mut table = ProcessTable::new(Box::new(source));
        table.update(100);
        table.update(100);

        assert!(table.get(1).is_none());
        let fresh = table.get(4).unwrap();
        assert_eq!((fresh.delta_user, fresh.delta_system), (0, 0));
        assert_eq!(fresh.cpu_percent, 0.0);
        let busy = table.get(2).unwrap();
        assert_eq!((busy.delta_user, busy.delta_system), (10, 5));
        assert!((busy.cpu_percent - 15.0).abs() < 1e-9);
        assert_eq!(table.len(), 3);
        assert_eq!(table.generation(), 2);
    }

    #[test]
    fn test_exit_mid_scan_drops_pid() {
        let source = ScriptedProcessSource::new()
            .frame(vec![proc_sample(1, 0, 0), proc_sample(2, 0, 0)])
            .frame_with_exits(vec![proc_sample(1, 0, 0)], vec![2]);
        let mut table = ProcessTable::new(Box::new(source));
        assert!(table.update(0));
        assert!(table.update(0));

        assert!(table.get(2).is_none());
        assert!(table.get(1).is_some());
    }

    #[test]
    fn test_zero_interval_ticks_gives_zero_percent() {
        let source = ScriptedProcessSource::new()
            .frame(vec![proc_sample(1, 0, 0)])
            .frame(vec![proc_sample(1, 50, 50)]);
        let mut table = ProcessTable::new(Box::new(source));
        table.update(0);
        table.update(0);
        assert_eq!(table.get(1).unwrap().cpu_percent, 0.0);
    }

    #[test]
    fn test_pid_reuse_resets_delta() {
        let mut reused = proc_sample(7, 900, 900);
        reused.start_time = 5000;
        let source = ScriptedProcessSource::new()
            .frame(vec![proc_sample(7, 100, 100)])
            .frame(vec![reused]);
        let mut table = ProcessTable::new(Box::new(source));
        table.update(100);
        table.update(100);
        assert_eq!(table.get(7).unwrap().delta_user, 0);
    }

    #[test]
    fn test_view_sorts_by_cpu_then_pid() {
        let source = ScriptedProcessSource::new()
            .frame(vec![
                proc_sample(9, 0, 0),
                proc_sample(3, 0, 0),
                proc_sample(5, 0, 0),
                proc_sample(1, 0, 0),
            ])
            .frame(vec![
                proc_sample(9, 10, 0),
                proc_sample(3, 0, 0),
                proc_sample(5, 10, 0),
                proc_sample(1, 30, 0),
            ]);
        let mut table = ProcessTable::new(Box::new(source));
        table.update(100);
        table.update(100);

        let pids: Vec<u32> = table.view(10).iter().map(|r| r.pid()).collect();
        assert_eq!(pids, vec![1, 5, 9, 3]);
        assert_eq!(table.view(2).len(), 2);
    }

    struct CountingNames {
        calls: Rc<Cell<usize>>,
    }

    impl NameLookup for CountingNames {
        fn user(&self, uid: u32) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            (uid == 0).then(|| "root".to_string())
        }

        fn group(&self, gid: u32) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            (gid == 0).then(|| "wheel".to_string())
        }
    }

    #[test]
    fn test_name_cache_memoizes_and_falls_back() {
        let calls = Rc::new(Cell::new(0));
        let mut names = NameCache::new(Box::new(CountingNames {
            calls: Rc::clone(&calls),
        }));

        assert_eq!(names.user(0), "root");
        assert_eq!(names.user(0), "root");
        assert_eq!(names.user(4321), "4321");
        assert_eq!(names.group(0), "wheel");
        assert_eq!(names.group(77), "77");
        assert_eq!(names.group(77), "77");
        assert_eq!(calls.get(), 4);
    }
}
