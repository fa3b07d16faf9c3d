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

//! Integration tests for the reporting surface and periodic service.

#![cfg(not(feature = "disabled"))]

use anyhow::Result;
use tickstat_telemetry::report::{self, render_timers};
use tickstat_telemetry::{
    Calibration, CounterKey, Report, StatsConfig, StatsService, TimerKey, UserStat,
};

static HANDLED: CounterKey = CounterKey::new("rt_handled", "Requests handled");
static HANDLE_TIME: TimerKey = TimerKey::new("rt_handle_time", "Time spent handling");

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_report_reflects_recorded_work() -> Result<()> {
    init_logger();

    for _ in 0..10 {
        HANDLED.increment();
        HANDLE_TIME.record(2_000);
    }
    let _pending = UserStat::register("rt_pending", "Pending requests", || "7".to_string())?;

    let calibration = Calibration::with_override(2.0)?;
    let report = Report::collect(&calibration);

    let counter = report
        .counters
        .iter()
        .find(|row| row.name == "rt_handled")
        .ok_or_else(|| anyhow::anyhow!("counter missing from report"))?;
    assert_eq!(counter.count, 10);
    assert_eq!(counter.description, "Requests handled");

    let timer = report
        .timers
        .iter()
        .find(|row| row.name == "rt_handle_time")
        .ok_or_else(|| anyhow::anyhow!("timer missing from report"))?;
    assert_eq!(timer.count, 10);
    assert_eq!(timer.cycles, 20_000);
    assert_eq!(timer.avg_cycles, Some(2_000));
    assert_eq!(timer.avg_nanos, Some(1_000.0));
    assert_eq!(timer.total_nanos, Some(10_000.0));

    let stat = report
        .user_stats
        .iter()
        .find(|row| row.name == "rt_pending")
        .ok_or_else(|| anyhow::anyhow!("user stat missing from report"))?;
    assert_eq!(stat.value, "7");

    let lines = report.lines();
    assert!(lines.iter().any(|line| line.starts_with("======TIMERS(freq = 2.000GHz)")));
    assert!(lines
        .iter()
        .any(|line| line.contains("rt_handle_time") && line.contains("1.000us(2000 cycles)")));

    let json: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
    assert_eq!(json["calibration"]["source"], "override");
    Ok(())
}

#[test]
fn test_logging_entry_points_do_not_mutate() -> Result<()> {
    init_logger();
    static LOGGED: CounterKey = CounterKey::new("rt_logged", "");
    LOGGED.add(4);

    let before = LOGGED.snapshot();
    report::log_all(&Calibration::unavailable());
    report::log_counter_stats();
    assert_eq!(LOGGED.snapshot(), before);
    assert_eq!(LOGGED.metric().live_instances(), 1);
    Ok(())
}

#[test]
fn test_uncalibrated_rendering() {
    let rows = report::timer_rows(&Calibration::unavailable());
    let lines = render_timers(&rows, &Calibration::unavailable());
    assert!(!lines.is_empty());
    for row in rows {
        assert_eq!(row.total_nanos, None);
        assert_eq!(row.avg_nanos, None);
    }
}

#[test]
fn test_service_reports_with_configured_calibration() -> Result<()> {
    init_logger();
    let config =
        StatsConfig::from_json(r#"{ "tsc_ghz_override": 4.0, "report_interval_ms": 60000 }"#)?;
    let service = StatsService::new(config)?;
    assert_eq!(service.calibration().ticks_per_ns(), Some(4.0));

    static SERVICED: CounterKey = CounterKey::new("rt_serviced", "");
    SERVICED.increment();
    let report = service.report();
    assert!(report.counters.iter().any(|row| row.name == "rt_serviced" && row.count == 1));
    service.log_now();
    Ok(())
}
