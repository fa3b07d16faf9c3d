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

// Tickstat Sandbox
// Spawns a pool of workers that count and time simulated jobs, then logs the
// aggregated report. Workers exit before the final report, so every number
// shown comes from retired per-thread instances.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tickstat_telemetry::{CounterKey, StatsConfig, StatsService, TimerKey, UserStat};

static JOBS_DONE: CounterKey = CounterKey::new("jobs_done", "Jobs completed by workers");
static JOBS_SKIPPED: CounterKey = CounterKey::new("jobs_skipped", "Jobs skipped as empty");
static JOB_TIME: TimerKey = TimerKey::new("job_time", "Time spent running a job");
static CHECKSUM_TIME: TimerKey = TimerKey::new("checksum_time", "Time spent in checksums");

const WORKERS: usize = 8;
const JOBS_PER_WORKER: u64 = 2_000;

fn checksum(seed: u64) -> u64 {
    let mut stopwatch = CHECKSUM_TIME.start();
    let mut acc = seed;
    for i in 0..256 {
        acc = acc.rotate_left(5) ^ i;
    }
    stopwatch.stop();
    acc
}

fn run_job(id: u64) -> u64 {
    if id % 97 == 0 {
        JOBS_SKIPPED.increment();
        return 0;
    }
    let result = JOB_TIME.time(|| checksum(id));
    JOBS_DONE.increment();
    result
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = StatsConfig::from_env()?;
    let mut service = StatsService::new(config)?;

    let busy = Arc::new(AtomicUsize::new(0));
    let _busy_stat = {
        let busy = Arc::clone(&busy);
        UserStat::register("busy_workers", "Workers still running", move || {
            busy.load(Ordering::Relaxed).to_string()
        })?
    };

    let workers: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let busy = Arc::clone(&busy);
            busy.fetch_add(1, Ordering::Relaxed);
            thread::spawn(move || {
                let mut folded = 0u64;
                for job in 0..JOBS_PER_WORKER {
                    folded ^= run_job(worker as u64 * JOBS_PER_WORKER + job);
                }
                busy.fetch_sub(1, Ordering::Relaxed);
                folded
            })
        })
        .collect();

    // Intermediate reports read live instances while the workers run.
    while busy.load(Ordering::Relaxed) > 0 {
        service.tick();
        thread::sleep(Duration::from_millis(20));
    }

    let mut folded = 0;
    for worker in workers {
        folded ^= worker
            .join()
            .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;
    }
    log::debug!("Folded checksum: {folded:#x}");

    service.log_now();
    let report = service.report();
    log::debug!("{}", report.to_json()?);
    Ok(())
}
