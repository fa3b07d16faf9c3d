// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The registry entry for one metric name.

use super::kind::MetricKind;
use ahash::AHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tickstat_core::{AtomicTally, MetricsError, MetricsResult, Tally};

/// Hands out the per-metric indices used by thread-local instance tables.
///
/// The lowest free index is reused first, so a thread's table grows with the
/// number of metrics alive at once rather than the number ever created. A
/// slot is released only when its metric is dropped, and every table entry
/// keeps its metric alive, so no table still refers to a released slot.
#[derive(Debug)]
pub(crate) struct SlotAllocator {
    next: usize,
    free: BTreeSet<usize>,
}

impl SlotAllocator {
    pub(crate) const fn new() -> Self {
        Self {
            next: 0,
            free: BTreeSet::new(),
        }
    }

    pub(crate) fn acquire(&mut self) -> usize {
        self.free.pop_first().unwrap_or_else(|| {
            let slot = self.next;
            self.next += 1;
            slot
        })
    }

    pub(crate) fn release(&mut self, slot: usize) {
        if slot + 1 != self.next {
            self.free.insert(slot);
            return;
        }
        // Trim the tail so the free set stays small.
        self.next = slot;
        while self.free.last().is_some_and(|&last| last + 1 == self.next) {
            self.free.pop_last();
            self.next -= 1;
        }
    }

    #[cfg(test)]
    fn high_water(&self) -> usize {
        self.next
    }
}

static SLOT_ALLOCATOR: Mutex<SlotAllocator> = Mutex::new(SlotAllocator::new());

fn slot_allocator() -> MutexGuard<'static, SlotAllocator> {
    SLOT_ALLOCATOR.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MetricState {
    next_id: u64,
    live: AHashMap<u64, Arc<AtomicTally>>,
    retired: Tally,
}

/// Process-wide entry for one metric name.
///
/// Holds the storage of every currently registered [`Instance`] plus a
/// `retired` tally of the instances that have already deregistered. At any
/// moment the true total is `retired` folded with the current value of every
/// live instance; [`snapshot`](Self::snapshot) computes exactly that.
///
/// A single lock serialises `register`, `deregister` and `snapshot` for this
/// metric. Different metrics never share a lock, and instance updates never
/// take one.
///
/// [`Instance`]: super::instance::Instance
pub struct NamedMetric<K: MetricKind> {
    name: String,
    description: String,
    slot: usize,
    state: Mutex<MetricState>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MetricKind> NamedMetric<K> {
    /// Creates a metric and adds it to its kind's directory.
    ///
    /// Fails with [`MetricsError::EmptyName`] for an empty name and with
    /// [`MetricsError::DuplicateName`] if a live metric of the same kind
    /// already uses the name. The metric leaves the directory when the last
    /// reference to it is dropped.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<Arc<Self>> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricsError::EmptyName);
        }
        let metric = Arc::new(Self {
            name,
            description: description.into(),
            slot: slot_allocator().acquire(),
            state: Mutex::new(MetricState::default()),
            _kind: PhantomData,
        });
        // On failure the metric is dropped here, which returns its slot.
        K::directory().insert(&metric)?;
        log::debug!("Registered {} '{}'", K::TYPE, metric.name);
        Ok(metric)
    }

    /// The metric's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The metric's free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    fn state(&self) -> MutexGuard<'_, MetricState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an instance's storage to the live set and returns its id.
    pub(crate) fn register(&self, cell: Arc<AtomicTally>) -> u64 {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id, cell);
        id
    }

    /// Folds an instance's final value into `retired` and drops it from the
    /// live set, in one critical section.
    ///
    /// The instance lifecycle guarantees one call per registered id.
    pub(crate) fn deregister(&self, id: u64) {
        let mut state = self.state();
        if let Some(cell) = state.live.remove(&id) {
            let last = cell.load();
            state.retired += last;
        }
    }

    /// Folds a contribution straight into the retired aggregate.
    ///
    /// Used for updates that arrive after the calling thread's instance table
    /// has already been torn down.
    pub fn absorb(&self, tally: Tally) {
        let mut state = self.state();
        state.retired += tally;
    }

    /// The current total: retired contributions plus every live instance.
    ///
    /// Live instances are read while their owners keep writing, so the result
    /// is a best-effort instantaneous value rather than a linearizable one.
    /// A metric nobody has touched yields [`Tally::IDENTITY`].
    pub fn snapshot(&self) -> Tally {
        let state = self.state();
        state
            .live
            .values()
            .fold(state.retired, |total, cell| total.fold(cell.load()))
    }

    /// The contributions of instances that have already deregistered.
    pub fn retired(&self) -> Tally {
        self.state().retired
    }

    /// Number of currently registered instances.
    pub fn live_instances(&self) -> usize {
        self.state().live.len()
    }
}

impl<K: MetricKind> Drop for NamedMetric<K> {
    fn drop(&mut self) {
        K::directory().remove(&self.name, self as *const Self);
        slot_allocator().release(self.slot);
        log::trace!("Dropped {} '{}'", K::TYPE, self.name);
    }
}

impl<K: MetricKind> fmt::Debug for NamedMetric<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedMetric")
            .field("kind", &K::TYPE)
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::kind::{Counter, Timer};

    #[test]
    fn test_untouched_metric_is_identity() {
        let metric = NamedMetric::<Timer>::new("named_untouched", "never used").unwrap();
        let snapshot = metric.snapshot();
        assert_eq!(snapshot, Tally::IDENTITY);
        assert_eq!(snapshot.average(), None);
        assert_eq!(metric.live_instances(), 0);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = NamedMetric::<Counter>::new("", "nameless").unwrap_err();
        assert_eq!(err, MetricsError::EmptyName);
    }

    #[test]
    fn test_register_deregister_moves_value_to_retired() {
        let metric = NamedMetric::<Counter>::new("named_register", "").unwrap();
        let cell = Arc::new(AtomicTally::new());
        let id = metric.register(Arc::clone(&cell));

        Counter::accumulate(&cell, 7);
        assert_eq!(metric.live_instances(), 1);
        assert_eq!(metric.snapshot(), Tally::new(7, 0));
        assert_eq!(metric.retired(), Tally::IDENTITY);

        metric.deregister(id);
        assert_eq!(metric.live_instances(), 0);
        assert_eq!(metric.retired(), Tally::new(7, 0));
        assert_eq!(metric.snapshot(), Tally::new(7, 0));

        // Writes after deregistration are no longer visible.
        Counter::accumulate(&cell, 100);
        assert_eq!(metric.snapshot(), Tally::new(7, 0));
    }

    #[test]
    fn test_snapshot_merges_live_and_retired() {
        let metric = NamedMetric::<Timer>::new("named_merge", "").unwrap();
        let cells: Vec<_> = (0..4).map(|_| Arc::new(AtomicTally::new())).collect();
        let ids: Vec<_> = cells
            .iter()
            .map(|cell| metric.register(Arc::clone(cell)))
            .collect();

        for (i, cell) in cells.iter().enumerate() {
            Timer::accumulate(cell, (i as u64 + 1) * 10);
        }
        metric.deregister(ids[0]);
        metric.deregister(ids[2]);

        assert_eq!(metric.retired(), Tally::new(2, 10 + 30));
        assert_eq!(metric.snapshot(), Tally::new(4, 10 + 20 + 30 + 40));
    }

    #[test]
    fn test_absorb_adds_to_retired() {
        let metric = NamedMetric::<Counter>::new("named_absorb", "").unwrap();
        metric.absorb(Tally::new(3, 0));
        metric.absorb(Tally::new(2, 0));
        assert_eq!(metric.snapshot(), Tally::new(5, 0));
        assert_eq!(metric.live_instances(), 0);
    }

    #[test]
    fn test_slot_allocator_reuses_lowest_free_slot() {
        let mut slots = SlotAllocator::new();
        let taken: Vec<_> = (0..5).map(|_| slots.acquire()).collect();
        assert_eq!(taken, vec![0, 1, 2, 3, 4]);

        slots.release(3);
        slots.release(1);
        assert_eq!(slots.acquire(), 1);
        assert_eq!(slots.acquire(), 3);
        assert_eq!(slots.acquire(), 5);
    }

    #[test]
    fn test_slot_allocator_shrinks_when_tail_is_released() {
        let mut slots = SlotAllocator::new();
        let taken: Vec<_> = (0..1_000).map(|_| slots.acquire()).collect();
        for slot in taken {
            slots.release(slot);
        }
        assert_eq!(slots.high_water(), 0);
        assert!(slots.free.is_empty());
        assert_eq!(slots.acquire(), 0);
    }

    #[test]
    fn test_failed_registration_returns_its_slot() {
        let _first = NamedMetric::<Counter>::new("named_dup_slot", "").unwrap();
        for _ in 0..1_000 {
            assert!(NamedMetric::<Counter>::new("named_dup_slot", "").is_err());
        }
        // Without reuse the high-water mark would have grown by a thousand.
        assert!(slot_allocator().high_water() < 1_000);
    }

    #[test]
    fn test_metrics_get_distinct_slots() {
        let a = NamedMetric::<Counter>::new("named_slot_a", "").unwrap();
        let b = NamedMetric::<Counter>::new("named_slot_b", "").unwrap();
        assert_ne!(a.slot(), b.slot());
    }
}
