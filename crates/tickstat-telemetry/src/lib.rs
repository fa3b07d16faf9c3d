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

//! # Tickstat Telemetry
//!
//! Per-thread counters and cycle timers whose contributions are merged into a
//! process-wide total per metric name.
//!
//! Every thread that touches a metric gets its own [`Instance`], which it
//! updates without locks. The shared [`NamedMetric`] tracks the live instances
//! plus a retired aggregate of the instances that have already been
//! destroyed, so a [`NamedMetric::snapshot`] covers every thread that ever
//! contributed, including threads that have exited.
//!
//! ```rust
//! use tickstat_telemetry::{CounterKey, TimerKey};
//!
//! static REQUESTS: CounterKey = CounterKey::new("doc_requests", "Requests served");
//! static PARSE: TimerKey = TimerKey::new("doc_parse", "Time spent parsing");
//!
//! REQUESTS.increment();
//! let value = PARSE.time(|| 6 * 7);
//! assert_eq!(value, 42);
//!
//! # #[cfg(not(feature = "disabled"))]
//! assert_eq!(REQUESTS.snapshot().count, 1);
//! ```

pub mod config;
pub mod metrics;
pub mod report;
pub mod service;
pub mod user_stats;
pub mod utils;

pub use config::{global_calibration, StatsConfig};
pub use metrics::{
    directory::Directory,
    instance::Instance,
    key::{CounterKey, MetricKey, TimerKey},
    kind::{Counter, MetricKind, Timer, ENABLED},
    named::NamedMetric,
};
pub use report::Report;
pub use service::StatsService;
pub use user_stats::UserStat;
pub use utils::timer::{ScopedTimer, Stopwatch};

pub use tickstat_core::{Calibration, MetricType, MetricsError, MetricsResult, Tally};
