//! Granary monitoring engine.
//!
//! The stateful core between sensor ingestion and the query facade:
//!
//! - [`registry`] — per-silo configuration (capacity, status, thresholds).
//! - [`lifecycle`] — the per-silo alert state machine.
//! - [`window`] — rolling time windows for KPI aggregation.
//! - [`aggregate`] — incrementally maintained KPI snapshots.
//! - [`monitor`] — the [`Monitor`] facade tying the pieces together under
//!   the per-silo single-writer concurrency model.
//!
//! Nothing in this crate performs I/O. Network and persistence belong to
//! the collaborators on either side; notification delivery runs on the
//! `granary-events` router task.

pub mod aggregate;
pub mod lifecycle;
pub mod monitor;
pub mod registry;
pub mod window;

pub use aggregate::{KpiAggregator, KpiSnapshot};
pub use monitor::{AlertAction, AlertFilter, Monitor, SiloSummary, SubmitOutcome};
pub use registry::{SiloConfig, SiloRegistry, SiloStatus};
