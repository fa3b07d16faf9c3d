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

//! # Tickstat Core
//!
//! Foundational crate containing the value types, clock contracts and error
//! definitions shared by the tickstat instrumentation layer.
//!
//! This crate defines the "what" of a measurement: how a single thread's
//! contribution is stored and how contributions combine. `tickstat-telemetry`
//! builds the process-wide registry and aggregation protocol on top of it.

#![warn(missing_docs)]

pub mod accumulator;
pub mod calibration;
pub mod clock;
pub mod error;

pub use accumulator::{AtomicTally, MetricType, Tally};
pub use calibration::{Calibration, CalibrationSource};
pub use clock::{CycleClock, DefaultClock, MonotonicClock};
pub use error::{MetricsError, MetricsResult};
