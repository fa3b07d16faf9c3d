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

//! Thread-affine handles that own one thread's running value for a metric.

use super::kind::{Counter, MetricKind, Timer, ENABLED};
use super::named::NamedMetric;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tickstat_core::{AtomicTally, Tally};

/// One thread's contribution to a [`NamedMetric`].
///
/// Creating an instance registers it with the metric; dropping it folds its
/// final value into the metric's retired aggregate and deregisters it. Drop
/// runs exactly once, including when the owning thread unwinds from a panic
/// or tears down its thread-local storage.
///
/// Updates through [`add`](Self::add) touch only the instance's own storage:
/// no lock, no read-modify-write. The type is `!Sync`, so it cannot be
/// updated from two threads at once.
pub struct Instance<K: MetricKind> {
    id: u64,
    cell: Arc<AtomicTally>,
    metric: Arc<NamedMetric<K>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<K: MetricKind> Instance<K> {
    /// Registers a new, empty instance with `metric`.
    pub fn create(metric: &Arc<NamedMetric<K>>) -> Self {
        let cell = Arc::new(AtomicTally::new());
        let id = metric.register(Arc::clone(&cell));
        Self {
            id,
            cell,
            metric: Arc::clone(metric),
            _not_sync: PhantomData,
        }
    }

    /// Applies one update.
    #[inline]
    pub fn add(&self, delta: u64) {
        if ENABLED {
            K::accumulate(&self.cell, delta);
        }
    }

    /// This instance's running value.
    pub fn current(&self) -> Tally {
        self.cell.load()
    }

    /// The metric this instance contributes to.
    pub fn metric(&self) -> &Arc<NamedMetric<K>> {
        &self.metric
    }

    /// The process-wide total of the owning metric.
    pub fn stat(&self) -> Tally {
        self.metric.snapshot()
    }

    pub(crate) fn cell(&self) -> &Arc<AtomicTally> {
        &self.cell
    }
}

impl Instance<Counter> {
    /// Counts one event.
    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }
}

impl Instance<Timer> {
    /// Records one observation of `cycles` ticks.
    #[inline]
    pub fn record(&self, cycles: u64) {
        self.add(cycles);
    }
}

impl<K: MetricKind> Drop for Instance<K> {
    fn drop(&mut self) {
        self.metric.deregister(self.id);
    }
}

impl<K: MetricKind> fmt::Debug for Instance<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("metric", &self.metric.name())
            .field("id", &self.id)
            .field("current", &self.current())
            .finish()
    }
}
