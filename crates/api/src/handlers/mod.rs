//! HTTP handlers, grouped by resource.

pub mod alerts;
pub mod dashboard;
pub mod silos;
