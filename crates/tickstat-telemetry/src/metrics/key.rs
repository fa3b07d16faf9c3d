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

//! Declaration surface: static tokens naming a process-wide metric.

use super::instance::Instance;
use super::kind::{Counter, MetricKind, Timer, ENABLED};
use super::local;
use super::named::NamedMetric;
use crate::utils::timer::{RecordCycles, ScopedTimer, Stopwatch};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tickstat_core::{MetricsResult, Tally};

/// A counter declaration.
pub type CounterKey = MetricKey<Counter>;

/// A timer declaration.
pub type TimerKey = MetricKey<Timer>;

/// A shareable token for one named metric.
///
/// Declare it once in a `static`; any module or crate that can name the
/// static uses the same process-wide metric. The [`NamedMetric`] is created
/// lazily on first use, and each thread gets its own [`Instance`] the first
/// time it updates the metric. That instance is retired when the thread's
/// storage is torn down.
///
/// ```rust
/// use tickstat_telemetry::CounterKey;
///
/// static CACHE_MISSES: CounterKey = CounterKey::new("key_doc_cache_misses", "Cache misses");
///
/// std::thread::spawn(|| CACHE_MISSES.add(3)).join().unwrap();
/// CACHE_MISSES.increment();
/// # #[cfg(not(feature = "disabled"))]
/// assert_eq!(CACHE_MISSES.snapshot().count, 4);
/// ```
pub struct MetricKey<K: MetricKind> {
    name: &'static str,
    description: &'static str,
    metric: OnceLock<MetricsResult<Arc<NamedMetric<K>>>>,
}

impl<K: MetricKind> MetricKey<K> {
    /// Declares a metric. Nothing is registered until first use.
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            metric: OnceLock::new(),
        }
    }

    /// The declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The declared description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// The registered metric, registering it on first call.
    ///
    /// Registration happens once even under concurrent first use. A failed
    /// registration (duplicate or empty name) is remembered and returned to
    /// every caller.
    pub fn try_metric(&self) -> MetricsResult<&Arc<NamedMetric<K>>> {
        self.metric
            .get_or_init(|| NamedMetric::new(self.name, self.description))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The registered metric.
    ///
    /// # Panics
    ///
    /// Panics if the declaration is invalid, e.g. another live metric of the
    /// same kind already uses this name. That is a static configuration error.
    pub fn metric(&self) -> &Arc<NamedMetric<K>> {
        match self.try_metric() {
            Ok(metric) => metric,
            Err(err) => panic!("invalid {} declaration '{}': {err}", K::TYPE, self.name),
        }
    }

    /// Applies one update to the calling thread's instance.
    #[inline]
    pub fn add(&self, delta: u64) {
        if !ENABLED {
            return;
        }
        local::add(self.metric(), delta);
    }

    /// Creates a standalone instance, e.g. to keep in a caller-owned
    /// `thread_local!` and skip the per-thread table lookup.
    ///
    /// The instance is independent of the one [`add`](Self::add) keeps in the
    /// per-thread table: a thread that uses both contributes through two live
    /// instances, and [`local`](Self::local) only reports the table's one.
    /// Both still fold into the same metric exactly once. Pick one path per
    /// thread to keep a single instance per thread and metric.
    pub fn instance(&self) -> Instance<K> {
        Instance::create(self.metric())
    }

    /// The process-wide total across live and exited threads.
    pub fn snapshot(&self) -> Tally {
        if !ENABLED {
            return Tally::IDENTITY;
        }
        self.metric().snapshot()
    }

    /// The calling thread's own running value.
    pub fn local(&self) -> Tally {
        if !ENABLED {
            return Tally::IDENTITY;
        }
        local::current(self.metric())
    }
}

impl MetricKey<Counter> {
    /// Counts one event.
    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }
}

impl MetricKey<Timer> {
    /// Records one observation of `cycles` ticks.
    #[inline]
    pub fn record(&self, cycles: u64) {
        self.add(cycles);
    }

    /// Starts a stopwatch that records into this timer when stopped.
    pub fn start(&self) -> Stopwatch<'_> {
        Stopwatch::new(self)
    }

    /// Starts a timer that records when it goes out of scope.
    pub fn scoped(&self) -> ScopedTimer<'_> {
        ScopedTimer::new(self)
    }

    /// Runs `f` and records its duration as one observation.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let _timer = self.scoped();
        f()
    }
}

impl RecordCycles for MetricKey<Timer> {
    fn record_cycles(&self, cycles: u64) {
        self.record(cycles);
    }
}

impl<K: MetricKind> fmt::Debug for MetricKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricKey")
            .field("kind", &K::TYPE)
            .field("name", &self.name)
            .field("registered", &self.metric.get().is_some())
            .finish()
    }
}
