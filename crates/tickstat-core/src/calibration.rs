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

//! Conversion factor between clock ticks and wall time.
//!
//! Calibration only affects presentation. A failed or missing calibration
//! leaves every aggregate intact; reports then show raw cycles and mark the
//! derived times as unavailable.

use crate::clock::{ticks_between, CycleClock};
use crate::error::{MetricsError, MetricsResult};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default length of the measurement window used by [`Calibration::measure`].
pub const DEFAULT_CALIBRATION_SLEEP: Duration = Duration::from_millis(10);

/// Where a calibration factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationSource {
    /// Supplied by configuration.
    Override,
    /// Measured against the wall clock at startup.
    Measured,
    /// No usable factor could be obtained.
    Unavailable,
}

/// A ticks-per-nanosecond factor (numerically equal to the clock rate in GHz).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    ticks_per_ns: Option<f64>,
    source: CalibrationSource,
}

impl Calibration {
    /// Uses a configured tick rate instead of measuring one.
    pub fn with_override(ghz: f64) -> MetricsResult<Self> {
        if !ghz.is_finite() || ghz <= 0.0 {
            return Err(MetricsError::InvalidCalibration(ghz));
        }
        log::info!("predefined tick frequency as {ghz:.3}GHz");
        Ok(Self {
            ticks_per_ns: Some(ghz),
            source: CalibrationSource::Override,
        })
    }

    /// A calibration that converts nothing.
    pub const fn unavailable() -> Self {
        Self {
            ticks_per_ns: None,
            source: CalibrationSource::Unavailable,
        }
    }

    /// Derives the factor from a tick delta observed over a wall-clock interval.
    pub fn from_ticks(ticks: u64, elapsed: Duration) -> Self {
        let nanos = elapsed.as_nanos();
        if ticks == 0 || nanos == 0 {
            return Self::unavailable();
        }
        let ratio = ticks as f64 / nanos as f64;
        if ratio.is_finite() && ratio > 0.0 {
            Self {
                ticks_per_ns: Some(ratio),
                source: CalibrationSource::Measured,
            }
        } else {
            Self::unavailable()
        }
    }

    /// Measures the clock against [`Instant`] across a short sleep.
    pub fn measure<C: CycleClock>(clock: &C, sleep: Duration) -> Self {
        let wall_start = Instant::now();
        let start = clock.now();
        std::thread::sleep(sleep);
        let end = clock.now();
        let elapsed = wall_start.elapsed();

        let calibration = Self::from_ticks(ticks_between(start, end), elapsed);
        match calibration.ticks_per_ns {
            Some(ghz) => log::info!("measured tick frequency as {ghz:.3}GHz"),
            None => log::warn!(
                "tick frequency calibration failed after {elapsed:?}; reporting raw cycles only"
            ),
        }
        calibration
    }

    /// Ticks per nanosecond, if known.
    pub fn ticks_per_ns(&self) -> Option<f64> {
        self.ticks_per_ns
    }

    /// Where this factor came from.
    pub fn source(&self) -> CalibrationSource {
        self.source
    }

    /// Returns `true` if tick counts can be converted to time.
    pub fn is_available(&self) -> bool {
        self.ticks_per_ns.is_some()
    }

    /// Converts a tick count to nanoseconds.
    pub fn cycles_to_nanos(&self, cycles: u64) -> Option<f64> {
        self.ticks_per_ns.map(|rate| cycles as f64 / rate)
    }

    /// Converts a fractional tick count (e.g. an average) to nanoseconds.
    pub fn cycles_f64_to_nanos(&self, cycles: f64) -> Option<f64> {
        self.ticks_per_ns.map(|rate| cycles / rate)
    }
}
