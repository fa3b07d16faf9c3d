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

//! Free-running tick sources used to time code regions.
//!
//! The registry never interprets ticks: it only sums them. Converting ticks to
//! wall time is the job of [`Calibration`](crate::calibration::Calibration).

use std::sync::OnceLock;

/// A source of monotonically non-decreasing 64-bit tick samples.
pub trait CycleClock: Default {
    /// Takes one sample.
    fn now(&self) -> u64;
}

/// Ticks elapsed between two samples, saturating at zero.
///
/// A time-stamp counter read on a different core can lag slightly; the
/// saturation keeps such a sample from turning into a huge bogus duration.
#[inline]
pub fn ticks_between(start: u64, end: u64) -> u64 {
    end.saturating_sub(start)
}

#[cfg(target_arch = "x86")]
use std::arch::x86 as arch;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64 as arch;

/// Reads the time-stamp counter with `rdtsc`.
///
/// Cheapest sample available, but the read may be reordered with the
/// surrounding instructions.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Rdtsc;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CycleClock for Rdtsc {
    #[inline(always)]
    fn now(&self) -> u64 {
        // SAFETY: `rdtsc` is available on every x86 target Rust supports.
        unsafe { arch::_rdtsc() }
    }
}

/// Reads the time-stamp counter with `rdtscp`.
///
/// Waits for prior instructions to retire before sampling, which costs a
/// little more than [`Rdtsc`] but gives tighter measurements.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct Rdtscp;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CycleClock for Rdtscp {
    #[inline(always)]
    fn now(&self) -> u64 {
        let mut aux = 0u32;
        // SAFETY: `aux` is a valid, writable u32 for the duration of the call.
        unsafe { arch::__rdtscp(&mut aux) }
    }
}

fn shared_quanta() -> &'static quanta::Clock {
    static CLOCK: OnceLock<quanta::Clock> = OnceLock::new();
    CLOCK.get_or_init(quanta::Clock::new)
}

/// Portable clock backed by `quanta`'s raw counter.
///
/// Used where no time-stamp counter instruction is available.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    inner: &'static quanta::Clock,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            inner: shared_quanta(),
        }
    }
}

impl CycleClock for MonotonicClock {
    #[inline]
    fn now(&self) -> u64 {
        self.inner.raw()
    }
}

/// The clock used by timers, selected at build time.
#[cfg(all(any(target_arch = "x86", target_arch = "x86_64"), feature = "rdtscp"))]
pub type DefaultClock = Rdtscp;

/// The clock used by timers, selected at build time.
#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    not(feature = "rdtscp")
))]
pub type DefaultClock = Rdtsc;

/// The clock used by timers, selected at build time.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub type DefaultClock = MonotonicClock;
