//! Threshold evaluation: the severity ladder and hysteresis.
//!
//! Pure logic — no storage, no clocks. The caller fetches the silo's
//! thresholds and the prior per-dimension alert state and passes them in;
//! [`evaluate_reading`] maps one reading to a [`BreachState`] per monitored
//! dimension.
//!
//! For the high-direction dimensions (temperature, humidity) the tier is a
//! ratio ladder against the configured limit; for volume the unsafe
//! direction is low fill, tiered against the configured warn/critical
//! percentages.
//!
//! Hysteresis: once a dimension has an active alert, it stays active until
//! the reading drops below [`REARM_RATIO`] of the limit — merely falling
//! back under the limit is not enough. This keeps an alert from flapping
//! when a value oscillates around the boundary.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::thresholds::SiloThresholds;

/// Ratio of the limit below which a breached dimension re-arms (clears).
pub const REARM_RATIO: f64 = 0.90;

/// Ratio at which a breach escalates from medium to high.
pub const HIGH_RATIO: f64 = 1.10;

/// Ratio at which a breach escalates to critical.
pub const CRITICAL_RATIO: f64 = 1.25;

/// The monitored dimension an alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Temperature,
    Humidity,
    Volume,
}

impl AlertType {
    /// Human-readable dimension name used in alert titles.
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::Temperature => "Temperature",
            AlertType::Humidity => "Humidity",
            AlertType::Volume => "Volume",
        }
    }
}

/// Severity tier of a threshold violation. Ordered: `Low < Medium < High <
/// Critical`, so escalation is a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Approaching the limit (within the hysteresis band below it).
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Human-readable tier name used in alert titles.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

/// Evaluator verdict for one dimension of one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreachState {
    pub alert_type: AlertType,
    /// Whether an alert should exist for this dimension after this reading.
    pub active: bool,
    /// Severity tier of the current value, `None` when unremarkable.
    /// May be `Some` while `active` is false: a value in the band just
    /// below the limit is "approaching" but does not open an alert.
    pub severity: Option<Severity>,
    /// The triggering measurement.
    pub value: f64,
    /// The limit compared against.
    pub threshold: f64,
}

/// Prior per-dimension alert state for one silo, as seen by the evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorActive {
    pub temperature: bool,
    pub humidity: bool,
    pub volume: bool,
}

/// Tier a high-direction measurement by its ratio to the limit.
fn high_side_tier(ratio: f64) -> Option<Severity> {
    if ratio >= CRITICAL_RATIO {
        Some(Severity::Critical)
    } else if ratio >= HIGH_RATIO {
        Some(Severity::High)
    } else if ratio >= 1.0 {
        Some(Severity::Medium)
    } else if ratio >= REARM_RATIO {
        Some(Severity::Low)
    } else {
        None
    }
}

/// Evaluate one high-direction dimension (temperature or humidity).
///
/// A new alert opens only at or above the limit itself; an existing alert
/// stays active anywhere at or above the re-arm point.
fn evaluate_high_side(
    alert_type: AlertType,
    value: f64,
    threshold: f64,
    prior_active: bool,
) -> BreachState {
    let ratio = value / threshold;
    let active = if prior_active {
        ratio >= REARM_RATIO
    } else {
        ratio >= 1.0
    };
    BreachState {
        alert_type,
        active,
        severity: high_side_tier(ratio),
        value,
        threshold,
    }
}

/// Evaluate the low-fill volume dimension.
///
/// Critical below the configured critical percentage, medium below the warn
/// percentage. The breach clears as soon as the fill level is back at or
/// above the warn percentage.
fn evaluate_low_volume(volume_percent: f64, thresholds: &SiloThresholds) -> BreachState {
    let severity = if volume_percent < thresholds.low_volume_critical_pct {
        Some(Severity::Critical)
    } else if volume_percent < thresholds.low_volume_warn_pct {
        Some(Severity::Medium)
    } else {
        None
    };
    BreachState {
        alert_type: AlertType::Volume,
        active: severity.is_some(),
        severity,
        value: volume_percent,
        threshold: thresholds.low_volume_warn_pct,
    }
}

/// Evaluate a reading against a silo's thresholds.
///
/// Returns one [`BreachState`] per monitored dimension, in a fixed order
/// (temperature, humidity, volume). Deterministic: same inputs, same output.
pub fn evaluate_reading(
    reading: &Reading,
    thresholds: &SiloThresholds,
    prior: PriorActive,
) -> [BreachState; 3] {
    [
        evaluate_high_side(
            AlertType::Temperature,
            reading.temperature,
            thresholds.max_temperature,
            prior.temperature,
        ),
        evaluate_high_side(
            AlertType::Humidity,
            reading.humidity,
            thresholds.max_humidity,
            prior.humidity,
        ),
        evaluate_low_volume(reading.volume_percent, thresholds),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn reading(temp: f64, humidity: f64, volume: f64) -> Reading {
        Reading {
            silo_id: 1,
            timestamp: Utc::now(),
            temperature: temp,
            humidity,
            volume_percent: volume,
            volume_tons: None,
        }
    }

    fn thresholds() -> SiloThresholds {
        SiloThresholds {
            max_temperature: 30.0,
            max_humidity: 75.0,
            low_volume_warn_pct: 10.0,
            low_volume_critical_pct: 5.0,
        }
    }

    fn temp_state(temp: f64, prior: PriorActive) -> BreachState {
        evaluate_reading(&reading(temp, 50.0, 50.0), &thresholds(), prior)[0]
    }

    #[test]
    fn below_rearm_point_is_unremarkable() {
        let state = temp_state(26.0, PriorActive::default());
        assert!(!state.active);
        assert_eq!(state.severity, None);
    }

    #[test]
    fn approaching_band_does_not_open_an_alert() {
        // 28 / 30 = 0.933 — in the band, but no prior alert.
        let state = temp_state(28.0, PriorActive::default());
        assert!(!state.active);
        assert_eq!(state.severity, Some(Severity::Low));
    }

    #[test]
    fn severity_ladder_tiers() {
        // Ratios: 31/30 = 1.03, 34/30 = 1.13, 38/30 = 1.27.
        assert_eq!(
            temp_state(31.0, PriorActive::default()).severity,
            Some(Severity::Medium)
        );
        assert_eq!(
            temp_state(34.0, PriorActive::default()).severity,
            Some(Severity::High)
        );
        assert_eq!(
            temp_state(38.0, PriorActive::default()).severity,
            Some(Severity::Critical)
        );
    }

    #[test]
    fn breach_opens_at_the_limit() {
        let state = temp_state(30.0, PriorActive::default());
        assert!(state.active);
        assert_eq!(state.severity, Some(Severity::Medium));
        assert_eq!(state.threshold, 30.0);
    }

    #[test]
    fn active_breach_holds_through_hysteresis_band() {
        let prior = PriorActive {
            temperature: true,
            ..Default::default()
        };
        // 28 / 30 = 0.933, above the 0.9 re-arm point.
        let state = temp_state(28.0, prior);
        assert!(state.active);
        assert_eq!(state.severity, Some(Severity::Low));
    }

    #[test]
    fn active_breach_clears_below_rearm_point() {
        let prior = PriorActive {
            temperature: true,
            ..Default::default()
        };
        // 26 / 30 = 0.867, below the re-arm point.
        let state = temp_state(26.0, prior);
        assert!(!state.active);
        assert_eq!(state.severity, None);
    }

    #[test]
    fn humidity_ladder_matches_temperature_ladder() {
        // 80 / 75 = 1.067 — medium.
        let states = evaluate_reading(&reading(20.0, 80.0, 50.0), &thresholds(), PriorActive::default());
        assert_eq!(states[1].alert_type, AlertType::Humidity);
        assert!(states[1].active);
        assert_eq!(states[1].severity, Some(Severity::Medium));
    }

    #[test]
    fn low_volume_warn_and_critical_tiers() {
        let warn = evaluate_reading(&reading(20.0, 50.0, 8.0), &thresholds(), PriorActive::default())[2];
        assert!(warn.active);
        assert_eq!(warn.severity, Some(Severity::Medium));
        assert_eq!(warn.threshold, 10.0);

        let critical = evaluate_reading(&reading(20.0, 50.0, 3.0), &thresholds(), PriorActive::default())[2];
        assert!(critical.active);
        assert_eq!(critical.severity, Some(Severity::Critical));
    }

    #[test]
    fn volume_clears_at_warn_level() {
        let prior = PriorActive {
            volume: true,
            ..Default::default()
        };
        let state = evaluate_reading(&reading(20.0, 50.0, 10.0), &thresholds(), prior)[2];
        assert!(!state.active);
        assert_eq!(state.severity, None);
    }

    #[test]
    fn severity_ordering_supports_escalation_compare() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
