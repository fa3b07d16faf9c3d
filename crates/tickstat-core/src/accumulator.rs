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

//! Accumulator values and the per-instance storage they are read from.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicU64, Ordering};

/// The kind of a named metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Accumulates only an event count.
    Counter,
    /// Accumulates an event count plus a summed duration in clock ticks.
    Timer,
}

impl MetricType {
    /// Returns the lowercase label used in reports and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Timer => "timer",
        }
    }
}

impl Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A plain accumulated value: an observation count plus a summed value.
///
/// For counters `value` stays zero and `count` carries the total. For timers
/// `count` is the number of observations and `value` the summed cycles.
///
/// Tallies combine with [`Tally::fold`], which is associative and commutative,
/// so the order in which contributions are folded never changes a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tally {
    /// Number of recorded events.
    pub count: u64,
    /// Summed value of the recorded events (cycles for timers).
    pub value: u64,
}

impl Tally {
    /// The fold identity: no events, no value.
    pub const IDENTITY: Tally = Tally { count: 0, value: 0 };

    /// Creates a tally from its raw parts.
    pub const fn new(count: u64, value: u64) -> Self {
        Self { count, value }
    }

    /// Combines two tallies field by field.
    ///
    /// Addition wraps instead of panicking so the reporting path can never
    /// abort on a pathological overflow.
    #[inline]
    pub const fn fold(self, other: Tally) -> Tally {
        Tally {
            count: self.count.wrapping_add(other.count),
            value: self.value.wrapping_add(other.value),
        }
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Integer average value per event, or `None` when there are no events.
    pub fn average(&self) -> Option<u64> {
        self.value.checked_div(self.count)
    }

    /// Floating point average value per event, or `None` when there are no events.
    pub fn average_f64(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.value as f64 / self.count as f64)
        }
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        self.fold(rhs)
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Tally) {
        *self = self.fold(rhs);
    }
}

impl Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::IDENTITY, Tally::fold)
    }
}

impl<'a> Sum<&'a Tally> for Tally {
    fn sum<I: Iterator<Item = &'a Tally>>(iter: I) -> Tally {
        iter.copied().sum()
    }
}

/// Storage for one instance's running tally.
///
/// There is exactly one writer (the owning thread) and any number of readers
/// (snapshotting threads). Writes are a relaxed load followed by a relaxed
/// store, with no read-modify-write and no lock. Readers may observe a
/// slightly stale value, never a torn one.
#[derive(Debug, Default)]
pub struct AtomicTally {
    count: AtomicU64,
    value: AtomicU64,
}

impl AtomicTally {
    /// Creates an empty tally.
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            value: AtomicU64::new(0),
        }
    }

    /// Adds to both fields.
    ///
    /// Must only be called by the single owning writer: two concurrent
    /// writers would lose updates.
    #[inline]
    pub fn record(&self, count_delta: u64, value_delta: u64) {
        let count = self.count.load(Ordering::Relaxed);
        self.count
            .store(count.wrapping_add(count_delta), Ordering::Relaxed);
        if value_delta != 0 {
            let value = self.value.load(Ordering::Relaxed);
            self.value
                .store(value.wrapping_add(value_delta), Ordering::Relaxed);
        }
    }

    /// Reads the current value. Safe from any thread.
    #[inline]
    pub fn load(&self) -> Tally {
        Tally {
            count: self.count.load(Ordering::Relaxed),
            value: self.value.load(Ordering::Relaxed),
        }
    }
}
