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

//! Runtime configuration for calibration and periodic reporting.

use crate::metrics::kind::ENABLED;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tickstat_core::clock::DefaultClock;
use tickstat_core::{Calibration, MetricsError, MetricsResult};

/// Environment variable overriding the tick rate, in GHz.
pub const ENV_TSC_GHZ: &str = "TICKSTAT_TSC_GHZ";
/// Environment variable overriding the report interval, in milliseconds.
pub const ENV_REPORT_INTERVAL_MS: &str = "TICKSTAT_REPORT_INTERVAL_MS";
/// Environment variable overriding the calibration window, in milliseconds.
pub const ENV_CALIBRATION_SLEEP_MS: &str = "TICKSTAT_CALIBRATION_SLEEP_MS";

const MAX_CALIBRATION_SLEEP_MS: u64 = 1_000;

/// Configuration of the stats layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Minimum time between two periodic reports, in milliseconds.
    pub report_interval_ms: u64,
    /// Length of the startup calibration window, in milliseconds.
    pub calibration_sleep_ms: u64,
    /// Known tick rate in GHz. Skips the startup measurement when set.
    pub tsc_ghz_override: Option<f64>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 1_000,
            calibration_sleep_ms: 10,
            tsc_ghz_override: None,
        }
    }
}

impl StatsConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> MetricsResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Parses a JSON configuration document; missing fields take defaults.
    pub fn from_json(json: &str) -> MetricsResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MetricsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by environment variable name.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> MetricsResult<Self> {
        if let Some(raw) = lookup(ENV_TSC_GHZ) {
            self.tsc_ghz_override = Some(parse(ENV_TSC_GHZ, &raw)?);
        }
        if let Some(raw) = lookup(ENV_REPORT_INTERVAL_MS) {
            self.report_interval_ms = parse(ENV_REPORT_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CALIBRATION_SLEEP_MS) {
            self.calibration_sleep_ms = parse(ENV_CALIBRATION_SLEEP_MS, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> MetricsResult<()> {
        if self.report_interval_ms == 0 {
            return Err(MetricsError::InvalidConfig(
                "report_interval_ms must be positive".to_string(),
            ));
        }
        if self.calibration_sleep_ms == 0 || self.calibration_sleep_ms > MAX_CALIBRATION_SLEEP_MS {
            return Err(MetricsError::InvalidConfig(format!(
                "calibration_sleep_ms must be within 1..={MAX_CALIBRATION_SLEEP_MS}, got {}",
                self.calibration_sleep_ms
            )));
        }
        if let Some(ghz) = self.tsc_ghz_override {
            if !ghz.is_finite() || ghz <= 0.0 {
                return Err(MetricsError::InvalidCalibration(ghz));
            }
        }
        Ok(())
    }

    /// The report interval as a [`Duration`].
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// The calibration window as a [`Duration`].
    pub fn calibration_sleep(&self) -> Duration {
        Duration::from_millis(self.calibration_sleep_ms)
    }

    /// Produces the calibration this configuration asks for.
    ///
    /// Uses the override when present, measures the default clock otherwise.
    /// A disabled build never measures.
    pub fn calibrate(&self) -> Calibration {
        if !ENABLED {
            return Calibration::unavailable();
        }
        if let Some(ghz) = self.tsc_ghz_override {
            match Calibration::with_override(ghz) {
                Ok(calibration) => return calibration,
                Err(e) => log::warn!("Ignoring tick rate override: {e}"),
            }
        }
        Calibration::measure(&DefaultClock::default(), self.calibration_sleep())
    }
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> MetricsResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| MetricsError::InvalidConfig(format!("{key}={raw:?}: {e}")))
}

static GLOBAL_CALIBRATION: OnceLock<Calibration> = OnceLock::new();

/// Installs the process-wide calibration from `config`.
///
/// The first call wins; later calls, and [`global_calibration`], return the
/// calibration already installed.
pub fn init_global_calibration(config: &StatsConfig) -> &'static Calibration {
    GLOBAL_CALIBRATION.get_or_init(|| config.calibrate())
}

/// The process-wide calibration, measured on first use from the environment
/// configuration.
pub fn global_calibration() -> &'static Calibration {
    GLOBAL_CALIBRATION.get_or_init(|| {
        let config = StatsConfig::from_env().unwrap_or_else(|e| {
            log::warn!("Invalid stats configuration in environment, using defaults: {e}");
            StatsConfig::default()
        });
        config.calibrate()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = StatsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.report_interval(), Duration::from_secs(1));
        assert_eq!(config.calibration_sleep(), Duration::from_millis(10));
    }

    #[test]
    fn test_overrides_applied() {
        let config = StatsConfig::default()
            .with_overrides(lookup(&[
                (ENV_TSC_GHZ, "2.3"),
                (ENV_REPORT_INTERVAL_MS, " 250 "),
                (ENV_CALIBRATION_SLEEP_MS, "20"),
            ]))
            .unwrap();
        assert_eq!(config.tsc_ghz_override, Some(2.3));
        assert_eq!(config.report_interval_ms, 250);
        assert_eq!(config.calibration_sleep_ms, 20);
    }

    #[test]
    fn test_bad_overrides_rejected() {
        let unparsable = StatsConfig::default().with_overrides(lookup(&[(ENV_TSC_GHZ, "fast")]));
        assert!(matches!(unparsable, Err(MetricsError::InvalidConfig(_))));

        let negative = StatsConfig::default().with_overrides(lookup(&[(ENV_TSC_GHZ, "-1")]));
        assert!(matches!(negative, Err(MetricsError::InvalidCalibration(_))));

        let zero_interval =
            StatsConfig::default().with_overrides(lookup(&[(ENV_REPORT_INTERVAL_MS, "0")]));
        assert!(zero_interval.is_err());

        let long_sleep =
            StatsConfig::default().with_overrides(lookup(&[(ENV_CALIBRATION_SLEEP_MS, "5000")]));
        assert!(long_sleep.is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = StatsConfig::from_json(r#"{ "tsc_ghz_override": 3.0 }"#).unwrap();
        assert_eq!(config.tsc_ghz_override, Some(3.0));
        assert_eq!(config.report_interval_ms, 1_000);

        assert!(StatsConfig::from_json("{ not json").is_err());
        assert!(StatsConfig::from_json(r#"{ "report_interval_ms": 0 }"#).is_err());
    }

    #[cfg(not(feature = "disabled"))]
    #[test]
    fn test_calibrate_prefers_override() {
        let config = StatsConfig {
            tsc_ghz_override: Some(1.5),
            ..StatsConfig::default()
        };
        let calibration = config.calibrate();
        assert_eq!(calibration.ticks_per_ns(), Some(1.5));
        assert_eq!(calibration.source(), tickstat_core::CalibrationSource::Override);
    }

    #[test]
    fn test_global_calibration_is_stable() {
        let first = global_calibration() as *const Calibration;
        let second = init_global_calibration(&StatsConfig::default()) as *const Calibration;
        assert_eq!(first, second);
    }
}
