//! Per-silo configured limits.
//!
//! A [`SiloThresholds`] value is an immutable snapshot: the engine clones it
//! out of the registry before each evaluation, so a concurrent configuration
//! update never changes the limits mid-evaluation. Updates apply to
//! subsequent readings only.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default maximum safe grain temperature in °C.
pub const DEFAULT_MAX_TEMPERATURE: f64 = 30.0;

/// Default maximum safe relative humidity in %.
pub const DEFAULT_MAX_HUMIDITY: f64 = 75.0;

/// Default fill level (%) below which a low-volume warning opens.
pub const DEFAULT_LOW_VOLUME_WARN_PCT: f64 = 10.0;

/// Default fill level (%) below which the low-volume condition is critical.
pub const DEFAULT_LOW_VOLUME_CRITICAL_PCT: f64 = 5.0;

/// Configured alerting limits for a single silo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiloThresholds {
    /// Maximum safe grain temperature in °C.
    pub max_temperature: f64,
    /// Maximum safe relative humidity in %.
    pub max_humidity: f64,
    /// Fill level (%) below which a low-volume warning opens.
    pub low_volume_warn_pct: f64,
    /// Fill level (%) below which the low-volume condition is critical.
    pub low_volume_critical_pct: f64,
}

impl Default for SiloThresholds {
    fn default() -> Self {
        Self {
            max_temperature: DEFAULT_MAX_TEMPERATURE,
            max_humidity: DEFAULT_MAX_HUMIDITY,
            low_volume_warn_pct: DEFAULT_LOW_VOLUME_WARN_PCT,
            low_volume_critical_pct: DEFAULT_LOW_VOLUME_CRITICAL_PCT,
        }
    }
}

impl SiloThresholds {
    /// Validate the threshold configuration.
    ///
    /// Rules:
    /// - All values must be finite.
    /// - `max_temperature` must be positive (a ratio ladder against zero or
    ///   a negative limit is meaningless).
    /// - `max_humidity` and both volume percentages must be within [0, 100].
    /// - `low_volume_critical_pct` must be strictly below
    ///   `low_volume_warn_pct`.
    pub fn validate(&self) -> Result<(), CoreError> {
        let values = [
            self.max_temperature,
            self.max_humidity,
            self.low_volume_warn_pct,
            self.low_volume_critical_pct,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::Validation(
                "Threshold values must be finite numbers".to_string(),
            ));
        }
        if self.max_temperature <= 0.0 {
            return Err(CoreError::Validation(
                "max_temperature must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.max_humidity) {
            return Err(CoreError::Validation(
                "max_humidity must be within 0-100".to_string(),
            ));
        }
        for (name, pct) in [
            ("low_volume_warn_pct", self.low_volume_warn_pct),
            ("low_volume_critical_pct", self.low_volume_critical_pct),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(CoreError::Validation(format!(
                    "{name} must be within 0-100"
                )));
            }
        }
        if self.low_volume_critical_pct >= self.low_volume_warn_pct {
            return Err(CoreError::Validation(
                "low_volume_critical_pct must be below low_volume_warn_pct".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
