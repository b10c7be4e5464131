//! Granary domain core.
//!
//! Pure condition-monitoring logic for grain-storage silos — no I/O, no
//! async, no shared state. The stateful engine (`granary-engine`) and the
//! HTTP facade (`granary-api`) build on the types and functions here:
//!
//! - [`reading`] — validation and canonicalisation of raw sensor samples.
//! - [`thresholds`] — per-silo configured limits.
//! - [`severity`] — the threshold evaluator (severity ladder + hysteresis).
//! - [`alert`] — the alert entity and its deterministic titles.

pub mod alert;
pub mod error;
pub mod reading;
pub mod severity;
pub mod thresholds;
pub mod types;

pub use alert::{Alert, AlertStatus};
pub use error::CoreError;
pub use reading::{normalize, Normalized, RawReading, Reading};
pub use severity::{evaluate_reading, AlertType, BreachState, PriorActive, Severity};
pub use thresholds::SiloThresholds;
