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

//! The capability set that distinguishes counters from timers.
//!
//! Folding and the identity come from [`Tally`](tickstat_core::Tally), so a
//! kind only decides how a single update lands in an instance's storage and
//! which directory its metrics are enumerated from. The registry logic in
//! [`NamedMetric`](super::named::NamedMetric) is written once against this trait.

use super::directory::Directory;
use tickstat_core::{AtomicTally, MetricType};

/// `false` when the crate is built with the `disabled` feature.
///
/// Hot-path entry points test this constant first, so in a disabled build
/// they compile down to nothing.
pub const ENABLED: bool = cfg!(not(feature = "disabled"));

/// A kind of metric.
pub trait MetricKind: Sized + Send + Sync + 'static {
    /// The reported type of metrics of this kind.
    const TYPE: MetricType;

    /// Applies one update to an instance's storage.
    fn accumulate(cell: &AtomicTally, delta: u64);

    /// The process-wide directory of metrics of this kind.
    fn directory() -> &'static Directory<Self>;
}

/// Counter kind: every update adds `delta` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter;

/// Timer kind: every update is one observation of `delta` cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer;

static COUNTERS: Directory<Counter> = Directory::new();
static TIMERS: Directory<Timer> = Directory::new();

impl MetricKind for Counter {
    const TYPE: MetricType = MetricType::Counter;

    #[inline]
    fn accumulate(cell: &AtomicTally, delta: u64) {
        cell.record(delta, 0);
    }

    fn directory() -> &'static Directory<Self> {
        &COUNTERS
    }
}

impl MetricKind for Timer {
    const TYPE: MetricType = MetricType::Timer;

    #[inline]
    fn accumulate(cell: &AtomicTally, delta: u64) {
        cell.record(1, delta);
    }

    fn directory() -> &'static Directory<Self> {
        &TIMERS
    }
}
