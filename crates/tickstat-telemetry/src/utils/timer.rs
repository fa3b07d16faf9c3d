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

//! Stopwatches and RAII-based timers that record cycle counts into a timer.
//! (RAII = Resource Acquisition Is Initialization)

use crate::metrics::instance::Instance;
use crate::metrics::kind::{Timer, ENABLED};
use tickstat_core::clock::{ticks_between, CycleClock, DefaultClock};

/// Anything that accepts timer observations.
pub trait RecordCycles {
    /// Records one observation of `cycles` ticks.
    fn record_cycles(&self, cycles: u64);
}

impl RecordCycles for Instance<Timer> {
    fn record_cycles(&self, cycles: u64) {
        self.record(cycles);
    }
}

/// Measures a region, possibly in several pieces, and records the total as
/// a single timer observation.
///
/// In a build with the `disabled` feature the clock is never read and
/// nothing is recorded.
pub struct Stopwatch<'a, C: CycleClock = DefaultClock> {
    sink: &'a dyn RecordCycles,
    clock: C,
    started_at: Option<u64>,
    accumulated: u64,
    recorded: bool,
}

impl<'a> Stopwatch<'a, DefaultClock> {
    /// Creates a running stopwatch on the default clock.
    /// ## Arguments
    /// * `sink` - The timer that receives the observation on [`stop`](Self::stop).
    pub fn new(sink: &'a dyn RecordCycles) -> Self {
        Self::with_clock(sink, DefaultClock::default())
    }
}

impl<'a, C: CycleClock> Stopwatch<'a, C> {
    /// Creates a running stopwatch on a specific clock.
    pub fn with_clock(sink: &'a dyn RecordCycles, clock: C) -> Self {
        let mut stopwatch = Self {
            sink,
            clock,
            started_at: None,
            accumulated: 0,
            recorded: false,
        };
        stopwatch.resume();
        stopwatch
    }

    #[inline]
    fn sample(&self) -> u64 {
        if ENABLED {
            self.clock.now()
        } else {
            0
        }
    }

    /// Stops counting without recording. Does nothing if already paused.
    #[inline]
    pub fn pause(&mut self) {
        if let Some(start) = self.started_at.take() {
            let now = self.sample();
            self.accumulated = self.accumulated.saturating_add(ticks_between(start, now));
        }
    }

    /// Continues counting after a [`pause`](Self::pause). Does nothing if running.
    #[inline]
    pub fn resume(&mut self) {
        if self.started_at.is_none() {
            self.recorded = false;
            self.started_at = Some(self.sample());
        }
    }

    /// Discards everything measured so far and starts counting again.
    pub fn restart(&mut self) {
        self.accumulated = 0;
        self.recorded = false;
        self.started_at = Some(self.sample());
    }

    /// Returns `true` unless paused or stopped.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Cycles measured so far, including the running piece.
    pub fn elapsed_cycles(&self) -> u64 {
        match self.started_at {
            Some(start) => self
                .accumulated
                .saturating_add(ticks_between(start, self.sample())),
            None => self.accumulated,
        }
    }

    /// Records the measured cycles as one observation and resets.
    /// ## Returns
    /// The number of cycles recorded. The stopwatch is left paused; call
    /// [`resume`](Self::resume) or [`restart`](Self::restart) to reuse it.
    pub fn stop(&mut self) -> u64 {
        self.pause();
        let cycles = std::mem::take(&mut self.accumulated);
        self.recorded = true;
        if ENABLED {
            self.sink.record_cycles(cycles);
        }
        cycles
    }
}

/// A utility for timing the duration of a scope and automatically recording
/// the result in a timer when it is dropped.
///
/// This leverages the RAII pattern to ensure that the measurement is always
/// recorded, even in the case of early returns or panics.
pub struct ScopedTimer<'a, C: CycleClock = DefaultClock> {
    stopwatch: Stopwatch<'a, C>,
}

impl<'a> ScopedTimer<'a, DefaultClock> {
    /// Creates a new timer for the given sink and starts it immediately.
    pub fn new(sink: &'a dyn RecordCycles) -> Self {
        Self {
            stopwatch: Stopwatch::new(sink),
        }
    }
}

impl<'a, C: CycleClock> ScopedTimer<'a, C> {
    /// Creates a scoped timer on a specific clock.
    pub fn with_clock(sink: &'a dyn RecordCycles, clock: C) -> Self {
        Self {
            stopwatch: Stopwatch::with_clock(sink, clock),
        }
    }

    /// Access to the underlying stopwatch, e.g. to exclude a sub-region.
    pub fn stopwatch(&mut self) -> &mut Stopwatch<'a, C> {
        &mut self.stopwatch
    }
}

impl<C: CycleClock> Drop for ScopedTimer<'_, C> {
    fn drop(&mut self) {
        // Already stopped by hand through `stopwatch()`.
        if !self.stopwatch.recorded {
            self.stopwatch.stop();
        }
    }
}

#[cfg(all(test, not(feature = "disabled")))]
mod tests {
    use super::*;
    use crate::metrics::named::NamedMetric;
    use std::cell::{Cell, RefCell};
    use tickstat_core::Tally;

    /// Advances by a fixed step on every sample.
    #[derive(Default)]
    struct StepClock {
        now: Cell<u64>,
    }

    impl CycleClock for StepClock {
        fn now(&self) -> u64 {
            let now = self.now.get() + 10;
            self.now.set(now);
            now
        }
    }

    /// Never advances.
    #[derive(Default)]
    struct FrozenClock;

    impl CycleClock for FrozenClock {
        fn now(&self) -> u64 {
            42
        }
    }

    #[derive(Default)]
    struct Sink {
        recorded: RefCell<Vec<u64>>,
    }

    impl RecordCycles for Sink {
        fn record_cycles(&self, cycles: u64) {
            self.recorded.borrow_mut().push(cycles);
        }
    }

    #[test]
    fn test_stop_records_one_observation() {
        let sink = Sink::default();
        let mut stopwatch = Stopwatch::with_clock(&sink, StepClock::default());
        assert!(stopwatch.is_running());

        assert_eq!(stopwatch.stop(), 10);
        assert!(!stopwatch.is_running());
        assert_eq!(*sink.recorded.borrow(), vec![10]);
    }

    #[test]
    fn test_paused_region_is_excluded() {
        let sink = Sink::default();
        let clock = StepClock::default();
        let mut stopwatch = Stopwatch::with_clock(&sink, clock); // start at 10
        stopwatch.pause(); // 20: +10
        stopwatch.pause(); // already paused, no sample
        stopwatch.resume(); // 30
        stopwatch.resume(); // already running, no sample
        stopwatch.pause(); // 40: +10
        assert_eq!(stopwatch.elapsed_cycles(), 20);
        assert_eq!(stopwatch.stop(), 20);
        assert_eq!(*sink.recorded.borrow(), vec![20]);
    }

    #[test]
    fn test_restart_discards_measurement() {
        let sink = Sink::default();
        let mut stopwatch = Stopwatch::with_clock(&sink, StepClock::default()); // 10
        stopwatch.pause(); // 20
        stopwatch.restart(); // 30, accumulated cleared
        assert_eq!(stopwatch.stop(), 10); // 40
    }

    #[test]
    fn test_scoped_timer_records_on_drop() {
        let sink = Sink::default();
        {
            let mut scoped = ScopedTimer::with_clock(&sink, StepClock::default());
            scoped.stopwatch().pause();
            assert!(sink.recorded.borrow().is_empty());
        }
        assert_eq!(*sink.recorded.borrow(), vec![10]);
    }

    #[test]
    fn test_scoped_timer_stopped_by_hand_records_once() {
        let sink = Sink::default();
        {
            let mut scoped = ScopedTimer::with_clock(&sink, StepClock::default());
            assert_eq!(scoped.stopwatch().stop(), 10);
        }
        assert_eq!(*sink.recorded.borrow(), vec![10]);
    }

    #[test]
    fn test_scoped_timer_paused_without_elapsed_still_records() {
        let sink = Sink::default();
        {
            let mut scoped = ScopedTimer::with_clock(&sink, FrozenClock);
            scoped.stopwatch().pause();
        }
        assert_eq!(*sink.recorded.borrow(), vec![0]);
    }

    #[test]
    fn test_scoped_timer_resumed_after_stop_records_again() {
        let sink = Sink::default();
        {
            let mut scoped = ScopedTimer::with_clock(&sink, StepClock::default()); // 10
            scoped.stopwatch().stop(); // 20
            scoped.stopwatch().resume(); // 30
        } // 40
        assert_eq!(*sink.recorded.borrow(), vec![10, 10]);
    }

    #[test]
    fn test_scoped_timer_records_on_unwind() {
        let metric = NamedMetric::<Timer>::new("timer_unwind", "").unwrap();
        let instance = Instance::create(&metric);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scoped = ScopedTimer::with_clock(&instance, StepClock::default());
            panic!("interrupted");
        }));

        assert!(result.is_err());
        assert_eq!(instance.current(), Tally::new(1, 10));
    }

    #[test]
    fn test_default_clock_stopwatch_feeds_instance() {
        let metric = NamedMetric::<Timer>::new("timer_default_clock", "").unwrap();
        let instance = Instance::create(&metric);
        let mut stopwatch = Stopwatch::new(&instance);
        std::hint::black_box((0..1000u64).sum::<u64>());
        let cycles = stopwatch.stop();

        assert_eq!(instance.current(), Tally::new(1, cycles));
    }
}
