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

//! Error types for metric registration and configuration.

use crate::accumulator::MetricType;
use thiserror::Error;

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
///
/// None of these are raised on the hot path: they surface when a metric is
/// declared, when a calibration override is applied, or when configuration
/// is loaded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// Two metrics of the same kind were declared under the same name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// The kind of the colliding metrics.
        kind: MetricType,
        /// The colliding name.
        name: String,
    },
    /// A user stat was declared under a name already in use.
    #[error("duplicate user stat name: {0}")]
    DuplicateStat(String),
    /// A metric was declared with an empty name.
    #[error("metric name must not be empty")]
    EmptyName,
    /// A calibration override was zero, negative or not finite.
    #[error("invalid calibration override: {0} ticks/ns")]
    InvalidCalibration(f64),
    /// A configuration value could not be parsed or is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MetricsError::DuplicateName {
            kind: MetricType::Timer,
            name: "parse".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate timer name: parse");
        assert_eq!(
            MetricsError::InvalidCalibration(-1.0).to_string(),
            "invalid calibration override: -1 ticks/ns"
        );
        assert_eq!(
            MetricsError::EmptyName.to_string(),
            "metric name must not be empty"
        );
    }
}
