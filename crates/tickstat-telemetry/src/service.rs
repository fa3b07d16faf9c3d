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

//! Service for periodically reporting the aggregated stats.

use crate::config::{global_calibration, StatsConfig};
use crate::report::{self, Report};
use std::time::{Duration, Instant};
use tickstat_core::{Calibration, MetricsResult};

/// Service for periodically reporting the aggregated stats.
#[derive(Debug)]
pub struct StatsService {
    calibration: Calibration,
    last_report: Instant,
    report_interval: Duration,
}

impl StatsService {
    /// Creates a new service, calibrating the clock as `config` asks.
    pub fn new(config: StatsConfig) -> MetricsResult<Self> {
        config.validate()?;
        Ok(Self::with_calibration(&config, config.calibrate()))
    }

    /// Creates a new service with a calibration obtained elsewhere.
    pub fn with_calibration(config: &StatsConfig, calibration: Calibration) -> Self {
        Self {
            calibration,
            last_report: Instant::now(),
            report_interval: config.report_interval(),
        }
    }

    /// Should be called periodically (e.g., from a housekeeping loop).
    /// Logs a full report if the interval has passed.
    pub fn tick(&mut self) -> bool {
        if self.last_report.elapsed() >= self.report_interval {
            log::trace!("Reporting all stats...");
            self.log_now();
            self.last_report = Instant::now();
            true
        } else {
            false
        }
    }

    /// Logs a full report immediately.
    pub fn log_now(&self) {
        report::log_all(&self.calibration);
    }

    /// Collects a report without logging it.
    pub fn report(&self) -> Report {
        Report::collect(&self.calibration)
    }

    /// Returns the calibration used for derived times.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }
}

impl Default for StatsService {
    fn default() -> Self {
        Self::with_calibration(&StatsConfig::default(), *global_calibration())
    }
}
