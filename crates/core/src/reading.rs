//! Sensor sample validation and canonicalisation.
//!
//! [`normalize`] is the single entry point for raw samples: it either
//! produces a canonical [`Reading`], flags the sample as a duplicate of the
//! last accepted one, or rejects it with
//! [`CoreError::InvalidReading`]. Rejection is local to the one sample —
//! it never blocks later readings for the same or other silos.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{SiloId, Timestamp};

/// Lowest physically plausible grain temperature in °C.
pub const MIN_TEMPERATURE_C: f64 = -50.0;

/// Highest physically plausible grain temperature in °C.
pub const MAX_TEMPERATURE_C: f64 = 100.0;

/// How far a sample's timestamp may lag the last accepted reading for the
/// same silo before it is rejected as out-of-order. Sensor gateways batch
/// and retry, so a small backwards skew is tolerated.
pub const CLOCK_SKEW_TOLERANCE_SECS: i64 = 30;

/// A sensor sample as received from the ingestion collaborator, before any
/// validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    pub silo_id: SiloId,
    /// Measurement time. Samples without a timestamp are rejected.
    pub timestamp: Option<Timestamp>,
    pub temperature: f64,
    pub humidity: f64,
    pub volume_percent: f64,
    /// Absolute volume. When absent, the engine derives it from the silo's
    /// registered capacity.
    pub volume_tons: Option<f64>,
}

/// A validated, canonical sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub silo_id: SiloId,
    pub timestamp: Timestamp,
    pub temperature: f64,
    pub humidity: f64,
    pub volume_percent: f64,
    pub volume_tons: Option<f64>,
}

/// Outcome of normalising a raw sample that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// The sample is new and should be evaluated.
    Accepted(Reading),
    /// The sample carries the same timestamp as the last accepted reading
    /// for this silo. Dropped so that re-submission is idempotent.
    Duplicate,
}

/// Validate a raw sample against physical ranges and per-silo ordering.
///
/// `last_accepted` is the timestamp of the most recent reading admitted for
/// this silo, if any. A sample older than that by more than
/// [`CLOCK_SKEW_TOLERANCE_SECS`] is rejected; one equal to it is reported
/// as [`Normalized::Duplicate`].
pub fn normalize(
    raw: RawReading,
    last_accepted: Option<Timestamp>,
) -> Result<Normalized, CoreError> {
    let timestamp = raw
        .timestamp
        .ok_or_else(|| CoreError::InvalidReading("missing timestamp".to_string()))?;

    if let Some(last) = last_accepted {
        if timestamp == last {
            return Ok(Normalized::Duplicate);
        }
        if timestamp < last - Duration::seconds(CLOCK_SKEW_TOLERANCE_SECS) {
            return Err(CoreError::InvalidReading(format!(
                "out-of-order timestamp {timestamp} precedes last accepted {last}"
            )));
        }
    }

    if !raw.temperature.is_finite()
        || !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&raw.temperature)
    {
        return Err(CoreError::InvalidReading(format!(
            "temperature {} outside plausible range {MIN_TEMPERATURE_C}..{MAX_TEMPERATURE_C}",
            raw.temperature
        )));
    }

    if !raw.humidity.is_finite() || !(0.0..=100.0).contains(&raw.humidity) {
        return Err(CoreError::InvalidReading(format!(
            "humidity {} outside 0-100",
            raw.humidity
        )));
    }

    if !raw.volume_percent.is_finite() || !(0.0..=100.0).contains(&raw.volume_percent) {
        return Err(CoreError::InvalidReading(format!(
            "volume_percent {} outside 0-100",
            raw.volume_percent
        )));
    }

    if let Some(tons) = raw.volume_tons {
        if !tons.is_finite() || tons < 0.0 {
            return Err(CoreError::InvalidReading(format!(
                "volume_tons {tons} must be finite and non-negative"
            )));
        }
    }

    Ok(Normalized::Accepted(Reading {
        silo_id: raw.silo_id,
        timestamp,
        temperature: raw.temperature,
        humidity: raw.humidity,
        volume_percent: raw.volume_percent,
        volume_tons: raw.volume_tons,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
