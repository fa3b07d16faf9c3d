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

//! Read-only reporting over every registered metric.
//!
//! Reports are built from [`NamedMetric::snapshot`](crate::NamedMetric::snapshot)
//! and the user stat callbacks; producing one never mutates any metric.

use crate::metrics::kind::{Counter, MetricKind, Timer, ENABLED};
use crate::user_stats::for_each_user_stat;
use serde::Serialize;
use tickstat_core::{Calibration, Tally};

const NOT_APPLICABLE: &str = "N/A";
const MIN_NAME_WIDTH: usize = 8;

/// One timer's aggregate, with derived times where a calibration exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerRow {
    /// Timer name.
    pub name: String,
    /// Timer description.
    pub description: String,
    /// Number of observations.
    pub count: u64,
    /// Summed cycles over all observations.
    pub cycles: u64,
    /// Summed time, if the clock is calibrated.
    pub total_nanos: Option<f64>,
    /// Average cycles per observation, if there was at least one.
    pub avg_cycles: Option<u64>,
    /// Average time per observation, if calibrated and non-empty.
    pub avg_nanos: Option<f64>,
}

impl TimerRow {
    /// Derives a row from a timer snapshot.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tally: Tally,
        calibration: &Calibration,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            count: tally.count,
            cycles: tally.value,
            total_nanos: calibration.cycles_to_nanos(tally.value),
            avg_cycles: tally.average(),
            avg_nanos: tally
                .average_f64()
                .and_then(|cycles| calibration.cycles_f64_to_nanos(cycles)),
        }
    }
}

/// One counter's aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterRow {
    /// Counter name.
    pub name: String,
    /// Counter description.
    pub description: String,
    /// Total events.
    pub count: u64,
}

/// One user stat's current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStatRow {
    /// Stat name.
    pub name: String,
    /// Stat description.
    pub description: String,
    /// Value returned by the stat's callback.
    pub value: String,
}

/// Snapshots every registered timer.
pub fn timer_rows(calibration: &Calibration) -> Vec<TimerRow> {
    let mut rows = Vec::new();
    Timer::directory().for_each(|metric| {
        rows.push(TimerRow::new(
            metric.name(),
            metric.description(),
            metric.snapshot(),
            calibration,
        ));
    });
    rows
}

/// Snapshots every registered counter.
pub fn counter_rows() -> Vec<CounterRow> {
    let mut rows = Vec::new();
    Counter::directory().for_each(|metric| {
        rows.push(CounterRow {
            name: metric.name().to_string(),
            description: metric.description().to_string(),
            count: metric.snapshot().count,
        });
    });
    rows
}

/// Evaluates every registered user stat.
pub fn user_stat_rows() -> Vec<UserStatRow> {
    let mut rows = Vec::new();
    for_each_user_stat(|name, description, value| {
        rows.push(UserStatRow {
            name: name.to_string(),
            description: description.to_string(),
            value,
        });
    });
    rows
}

/// Formats a duration given in nanoseconds with the largest fitting unit.
pub fn format_time(nanos: f64) -> String {
    const UNITS: [&str; 4] = ["ns", "us", "ms", "s"];
    let mut value = nanos;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.3}{}", UNITS[unit])
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    let longest = names.map(str::len).max().unwrap_or(0);
    (longest + 2).max(MIN_NAME_WIDTH)
}

fn time_or_na(nanos: Option<f64>) -> String {
    nanos.map_or_else(|| NOT_APPLICABLE.to_string(), format_time)
}

/// Renders the timer table.
pub fn render_timers(rows: &[TimerRow], calibration: &Calibration) -> Vec<String> {
    if rows.is_empty() {
        return vec!["NO TIMERS REGISTERED".to_string()];
    }
    let width = name_width(rows.iter().map(|row| row.name.as_str()));
    let freq = calibration
        .ticks_per_ns()
        .map_or_else(|| NOT_APPLICABLE.to_string(), |ghz| format!("{ghz:.3}GHz"));

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("======TIMERS(freq = {freq})======"));
    lines.push(format!(
        "{:<width$}TIME\tCYCLES\tCOUNT\tAVERAGE\t\tDESCRIPTION",
        "NAME"
    ));
    for row in rows {
        let avg_cycles = row
            .avg_cycles
            .map_or_else(|| NOT_APPLICABLE.to_string(), |cycles| cycles.to_string());
        lines.push(format!(
            "{:<width$}{}\t{}\t{}\t{}({} cycles)\t{}",
            row.name,
            time_or_na(row.total_nanos),
            row.cycles,
            row.count,
            time_or_na(row.avg_nanos),
            avg_cycles,
            row.description,
        ));
    }
    lines
}

/// Renders the counter table.
pub fn render_counters(rows: &[CounterRow]) -> Vec<String> {
    if rows.is_empty() {
        return vec!["NO COUNTERS REGISTERED".to_string()];
    }
    let width = name_width(rows.iter().map(|row| row.name.as_str()));

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push("======COUNTERS======".to_string());
    lines.push(format!("{:<width$}COUNT\tDESCRIPTION", "NAME"));
    for row in rows {
        lines.push(format!("{:<width$}{}\t{}", row.name, row.count, row.description));
    }
    lines
}

/// Renders the user stat table.
pub fn render_user_stats(rows: &[UserStatRow]) -> Vec<String> {
    if rows.is_empty() {
        return vec!["NO USER STATS REGISTERED".to_string()];
    }
    let width = name_width(rows.iter().map(|row| row.name.as_str()));

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push("======USER STATS======".to_string());
    lines.push(format!("{:<width$}VALUE\tDESCRIPTION", "NAME"));
    for row in rows {
        lines.push(format!("{:<width$}{}\t{}", row.name, row.value, row.description));
    }
    lines
}

/// A complete point-in-time report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// The calibration used for derived times.
    pub calibration: Calibration,
    /// Every registered timer.
    pub timers: Vec<TimerRow>,
    /// Every registered counter.
    pub counters: Vec<CounterRow>,
    /// Every registered user stat.
    pub user_stats: Vec<UserStatRow>,
}

impl Report {
    /// Collects a report over all registered metrics and user stats.
    pub fn collect(calibration: &Calibration) -> Self {
        Self {
            calibration: *calibration,
            timers: timer_rows(calibration),
            counters: counter_rows(),
            user_stats: user_stat_rows(),
        }
    }

    /// All rendered tables, timers first.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = render_timers(&self.timers, &self.calibration);
        lines.extend(render_counters(&self.counters));
        lines.extend(render_user_stats(&self.user_stats));
        lines
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Logs the timer table at info level.
pub fn log_timer_stats(calibration: &Calibration) {
    if !ENABLED {
        return;
    }
    for line in render_timers(&timer_rows(calibration), calibration) {
        log::info!("{line}");
    }
}

/// Logs the counter table at info level.
pub fn log_counter_stats() {
    if !ENABLED {
        return;
    }
    for line in render_counters(&counter_rows()) {
        log::info!("{line}");
    }
}

/// Logs the user stat table at info level.
pub fn log_user_stats() {
    for line in render_user_stats(&user_stat_rows()) {
        log::info!("{line}");
    }
}

/// Logs timers, counters and user stats.
pub fn log_all(calibration: &Calibration) {
    log_timer_stats(calibration);
    log_counter_stats();
    log_user_stats();
}
