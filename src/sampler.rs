//! Double-buffered delta sampling.
//!
//! Every resource collector keeps three keyed snapshots of its entities:
//! `current` (latest read), `last` (the read before) and `delta`
//! (`current - last`, field by field). [`DeltaSampler`] implements that
//! bookkeeping once; collectors plug in a [`SnapshotSource`] that performs
//! the actual OS read.
//!
//! Keys are created on first sighting and never removed. Entities missing
//! from the latest read keep their values (their delta decays to zero) and
//! drop out of [`DeltaSampler::live_keys`], which is what renderers iterate.

use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// One cycle's keyed collection of metric records.
pub type Snapshot<K, M> = BTreeMap<K, M>;

/// A metric record that can be diffed against an older copy of itself.
pub trait DeltaRecord: Clone + Default + fmt::Debug {
    /// Field-wise `self - older`. Counters that went backwards yield zero.
    #[must_use]
    fn delta(&self, older: &Self) -> Self;
}

/// A collector backend: one point-in-time read per call.
pub trait SnapshotSource {
    /// Entity key (core name, interface name, ...).
    type Key: Ord + Clone + fmt::Debug;
    /// Per-entity record.
    type Record: DeltaRecord;

    /// Identifier used in logs and errors.
    fn id(&self) -> &'static str;

    /// Reads every entity once.
    fn read(&mut self) -> Result<Vec<(Self::Key, Self::Record)>>;
}

/// A boxed source for dynamic dispatch.
pub type BoxedSource<K, M> = Box<dyn SnapshotSource<Key = K, Record = M>>;

/// Saturating counter difference.
///
/// A counter that moved backwards (reset or wraparound) yields 0; the event
/// is logged at trace level.
#[inline]
pub fn counter_delta(current: u64, last: u64) -> u64 {
    if current < last {
        tracing::trace!(current, last, "counter regression clamped to zero");
        0
    } else {
        current - last
    }
}

/// Keyed current/last/delta snapshots fed by one [`SnapshotSource`].
pub struct DeltaSampler<K, M> {
    source: BoxedSource<K, M>,
    current: Snapshot<K, M>,
    last: Snapshot<K, M>,
    delta: Snapshot<K, M>,
    live: BTreeSet<K>,
    updates: u64,
    failures: u64,
    last_error: Option<String>,
    sampled_at: Option<Instant>,
    interval: Option<Duration>,
}

impl<K: Ord + Clone + fmt::Debug, M: DeltaRecord> DeltaSampler<K, M> {
    /// Creates an empty sampler over `source`.
    pub fn new(source: BoxedSource<K, M>) -> Self {
        Self {
            source,
            current: Snapshot::new(),
            last: Snapshot::new(),
            delta: Snapshot::new(),
            live: BTreeSet::new(),
            updates: 0,
            failures: 0,
            last_error: None,
            sampled_at: None,
            interval: None,
        }
    }

    /// Runs one sampling cycle.
    ///
    /// Calls the backend exactly once. On success `last` becomes a deep copy
    /// of the previous `current`, the fresh records overwrite `current`, and
    /// `delta` is recomputed for every known key (zero on first sighting).
    /// On failure all three snapshots are left untouched and `false` is
    /// returned.
    pub fn update(&mut self) -> bool {
        let fresh = match self.source.read() {
            Ok(records) => records,
            Err(e) => {
                self.failures += 1;
                tracing::warn!(
                    collector = self.source.id(),
                    error = %e,
                    "read failed, keeping previous values"
                );
                self.last_error = Some(e.to_string());
                return false;
            }
        };

        self.last.clone_from(&self.current);

        self.live.clear();
        for (key, record) in fresh {
            self.live.insert(key.clone());
            self.current.insert(key, record);
        }

        for (key, record) in &self.current {
            let delta = match self.last.get(key) {
                Some(older) => record.delta(older),
                None => M::default(),
            };
            self.delta.insert(key.clone(), delta);
        }

        let now = Instant::now();
        self.interval = self.sampled_at.map(|at| now.duration_since(at));
        self.sampled_at = Some(now);

        self.updates += 1;
        self.last_error = None;
        tracing::trace!(collector = self.source.id(), entities = self.live.len(), "sampled");
        true
    }

    /// Latest records, including entities not seen in the latest read.
    pub fn current(&self) -> &Snapshot<K, M> {
        &self.current
    }

    /// Records from the previous successful read.
    pub fn last(&self) -> &Snapshot<K, M> {
        &self.last
    }

    /// Per-entity differences between `current` and `last`.
    pub fn delta(&self) -> &Snapshot<K, M> {
        &self.delta
    }

    /// Latest record for `key`.
    pub fn current_of(&self, key: &K) -> Option<&M> {
        self.current.get(key)
    }

    /// Delta record for `key`.
    pub fn delta_of(&self, key: &K) -> Option<&M> {
        self.delta.get(key)
    }

    /// Keys present in the latest successful read, in key order.
    pub fn live_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.live.iter()
    }

    /// Whether `key` was present in the latest successful read.
    pub fn is_live(&self, key: &K) -> bool {
        self.live.contains(key)
    }

    /// Number of successful updates so far.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Number of failed backend reads so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Message of the latest failure, cleared by the next successful read.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Wall time between the two latest successful reads, which is the
    /// span `delta` covers. `None` until the second read.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// The backend identifier.
    pub fn id(&self) -> &'static str {
        self.source.id()
    }
}

impl<K: Ord + Clone + fmt::Debug, M: DeltaRecord> fmt::Debug for DeltaSampler<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaSampler")
            .field("source", &self.source.id())
            .field("entities", &self.current.len())
            .field("live", &self.live)
            .field("updates", &self.updates)
            .field("failures", &self.failures)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Scripted source
// ============================================================================

/// A source replaying prepared frames, one per read.
///
/// `None` frames simulate a failed read. Once the script runs out the last
/// successful frame is repeated, which models a machine at steady state.
#[derive(Debug, Clone)]
pub struct ScriptedSource<K, M> {
    id: &'static str,
    frames: VecDeque<Option<Vec<(K, M)>>>,
    steady: Option<Vec<(K, M)>>,
    reads: usize,
}

impl<K: Clone, M: Clone> ScriptedSource<K, M> {
    /// Creates an empty script.
    pub fn new(id: &'static str) -> Self {
        Self {
            id,
            frames: VecDeque::new(),
            steady: None,
            reads: 0,
        }
    }

    /// Appends a successful frame.
    #[must_use]
    pub fn frame(mut self, records: Vec<(K, M)>) -> Self {
        self.frames.push_back(Some(records));
        self
    }

    /// Appends a failing read.
    #[must_use]
    pub fn failure(mut self) -> Self {
        self.frames.push_back(None);
        self
    }

    /// Number of reads performed.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl<K, M> SnapshotSource for ScriptedSource<K, M>
where
    K: Ord + Clone + fmt::Debug,
    M: DeltaRecord,
{
    type Key = K;
    type Record = M;

    fn id(&self) -> &'static str {
        self.id
    }

    fn read(&mut self) -> Result<Vec<(K, M)>> {
        self.reads += 1;
        match self.frames.pop_front() {
            Some(Some(records)) => {
                self.steady = Some(records.clone());
                Ok(records)
            }
            Some(None) => Err(crate::error::MonitorError::collection(self.id, "scripted failure")),
            None => self
                .steady
                .clone()
                .ok_or(crate::error::MonitorError::CollectorUnavailable(self.id)),
        }
    }
}
