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

//! Per-thread table of the instances created through [`MetricKey`](super::key::MetricKey).

use super::instance::Instance;
use super::kind::MetricKind;
use super::named::NamedMetric;
use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;
use tickstat_core::{AtomicTally, Tally};

struct Slot {
    cell: Arc<AtomicTally>,
    // Keeps the instance registered until the table is torn down.
    _instance: Box<dyn Any>,
}

thread_local! {
    static SLOTS: RefCell<Vec<Option<Slot>>> = const { RefCell::new(Vec::new()) };
}

/// Applies `delta` to the calling thread's instance of `metric`, creating it
/// on first use.
///
/// When the thread's table has already been destroyed (an update issued from
/// another thread-local destructor), the update is folded directly into the
/// metric's retired aggregate instead.
#[inline]
pub(crate) fn add<K: MetricKind>(metric: &Arc<NamedMetric<K>>, delta: u64) {
    let index = metric.slot();
    let applied = SLOTS.try_with(|slots| {
        if let Some(Some(slot)) = slots.borrow().get(index) {
            K::accumulate(&slot.cell, delta);
            return;
        }

        let instance = Instance::create(metric);
        let cell = Arc::clone(instance.cell());
        K::accumulate(&cell, delta);

        let mut slots = slots.borrow_mut();
        if slots.len() <= index {
            slots.resize_with(index + 1, || None);
        }
        slots[index] = Some(Slot {
            cell,
            _instance: Box::new(instance),
        });
    });

    if applied.is_err() {
        let cell = AtomicTally::new();
        K::accumulate(&cell, delta);
        metric.absorb(cell.load());
    }
}

/// The calling thread's running value for `metric`; identity if this thread
/// has no instance.
pub(crate) fn current<K: MetricKind>(metric: &NamedMetric<K>) -> Tally {
    SLOTS
        .try_with(|slots| {
            slots
                .borrow()
                .get(metric.slot())
                .and_then(Option::as_ref)
                .map(|slot| slot.cell.load())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}
