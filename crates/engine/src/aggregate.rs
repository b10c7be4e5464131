//! Incrementally maintained KPI snapshots.
//!
//! [`KpiAggregator`] folds admitted readings and alert lifecycle events
//! into running sums and counters so that a snapshot read is O(1) — no
//! recomputation over reading history. All mutable state sits behind one
//! narrow mutex; readers receive an owned [`KpiSnapshot`], never a live
//! reference, so a partially-applied update can never be observed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Duration;
use serde::Serialize;

use granary_core::reading::Reading;
use granary_core::types::{SiloId, Timestamp};
use granary_core::Severity;
use granary_events::MonitorEvent;

use crate::registry::RegistryOverview;
use crate::window::RollingWindow;

/// Span of the rolling reading window feeding the average KPIs, in hours.
const READING_WINDOW_HOURS: i64 = 24;

/// Span of the recent-alert count window, in days.
const ALERT_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Silo fleet KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SiloKpis {
    pub total: usize,
    pub active: usize,
    /// Fill percentage across the fleet: current volume over total capacity.
    pub capacity_utilization: f64,
    pub total_capacity_tons: f64,
    pub current_volume_tons: f64,
}

/// Rolling reading KPIs over the trailing 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingKpis {
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub total_readings_24h: usize,
}

/// Alert KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertKpis {
    /// Non-resolved alerts (active and acknowledged).
    pub active: u64,
    /// Non-resolved alerts currently at critical severity.
    pub critical: u64,
    /// Alerts resolved since startup.
    pub resolved: u64,
    /// Alerts created in the trailing 7 days.
    pub recent_7_days: usize,
}

/// One consistent view of every KPI, taken at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub silos: SiloKpis,
    pub readings: ReadingKpis,
    pub alerts: AlertKpis,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// One reading's contribution to the rolling averages.
#[derive(Debug, Clone, Copy)]
struct ReadingSample {
    temperature: f64,
    humidity: f64,
}

struct AggregateState {
    /// Newest timestamp observed; eviction cutoffs never move backwards.
    watermark: Option<Timestamp>,
    readings: RollingWindow<ReadingSample>,
    temperature_sum: f64,
    humidity_sum: f64,
    recent_alerts: RollingWindow<()>,
    active_alerts: u64,
    critical_alerts: u64,
    resolved_alerts: u64,
    current_volume_tons: HashMap<SiloId, f64>,
}

impl AggregateState {
    /// Drain expired readings and subtract them from the running sums.
    fn evict_readings(&mut self, now: Timestamp) {
        for (_, sample) in self.readings.evict(now) {
            self.temperature_sum -= sample.temperature;
            self.humidity_sum -= sample.humidity;
        }
    }
}

/// Thread-safe incremental KPI aggregator.
pub struct KpiAggregator {
    inner: Mutex<AggregateState>,
}

impl Default for KpiAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl KpiAggregator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(AggregateState {
                watermark: None,
                readings: RollingWindow::new(Duration::hours(READING_WINDOW_HOURS)),
                temperature_sum: 0.0,
                humidity_sum: 0.0,
                recent_alerts: RollingWindow::new(Duration::days(ALERT_WINDOW_DAYS)),
                active_alerts: 0,
                critical_alerts: 0,
                resolved_alerts: 0,
                current_volume_tons: HashMap::new(),
            }),
        }
    }

    /// Fold one admitted reading into the rolling KPIs.
    ///
    /// `effective_volume_tons` is the reading's absolute volume, derived
    /// from registered capacity when the sample itself carried none.
    pub fn record_reading(&self, reading: &Reading, effective_volume_tons: Option<f64>) {
        let mut state = self.lock();

        let watermark = state
            .watermark
            .map_or(reading.timestamp, |w| w.max(reading.timestamp));
        state.watermark = Some(watermark);
        state.evict_readings(watermark);

        state.readings.push(
            reading.timestamp,
            ReadingSample {
                temperature: reading.temperature,
                humidity: reading.humidity,
            },
        );
        state.temperature_sum += reading.temperature;
        state.humidity_sum += reading.humidity;

        if let Some(tons) = effective_volume_tons {
            state.current_volume_tons.insert(reading.silo_id, tons);
        }
    }

    /// Fold one alert lifecycle event into the counters.
    pub fn record_event(&self, event: &MonitorEvent) {
        let mut state = self.lock();
        match event {
            MonitorEvent::AlertCreated { alert } => {
                state.active_alerts += 1;
                if alert.severity == Severity::Critical {
                    state.critical_alerts += 1;
                }
                state.recent_alerts.push(alert.created_at, ());
            }
            MonitorEvent::AlertUpdated {
                alert,
                previous_severity,
            } => {
                let was_critical = *previous_severity == Severity::Critical;
                let is_critical = alert.severity == Severity::Critical;
                if is_critical && !was_critical {
                    state.critical_alerts += 1;
                } else if was_critical && !is_critical {
                    state.critical_alerts = state.critical_alerts.saturating_sub(1);
                }
            }
            MonitorEvent::AlertResolved { alert } => {
                state.active_alerts = state.active_alerts.saturating_sub(1);
                if alert.severity == Severity::Critical {
                    state.critical_alerts = state.critical_alerts.saturating_sub(1);
                }
                state.resolved_alerts += 1;
            }
            // Acknowledgment keeps the alert in the non-resolved count;
            // rejected readings carry no KPI weight.
            MonitorEvent::AlertAcknowledged { .. } | MonitorEvent::ReadingRejected { .. } => {}
        }
    }

    /// Take one consistent snapshot as of `now`.
    ///
    /// Eviction runs against the later of `now` and the newest reading
    /// timestamp, so replayed histories with synthetic clocks behave the
    /// same as live ones.
    pub fn snapshot(&self, now: Timestamp, overview: RegistryOverview) -> KpiSnapshot {
        let mut state = self.lock();

        let cutoff_now = state.watermark.map_or(now, |w| w.max(now));
        state.evict_readings(cutoff_now);
        state.recent_alerts.evict(cutoff_now);

        let count = state.readings.len();
        let (average_temperature, average_humidity) = if count == 0 {
            (0.0, 0.0)
        } else {
            (
                round2(state.temperature_sum / count as f64),
                round2(state.humidity_sum / count as f64),
            )
        };

        let current_volume_tons: f64 = state.current_volume_tons.values().sum();
        let capacity_utilization = if overview.total_capacity_tons > 0.0 {
            round2(current_volume_tons / overview.total_capacity_tons * 100.0)
        } else {
            0.0
        };

        KpiSnapshot {
            silos: SiloKpis {
                total: overview.total,
                active: overview.active,
                capacity_utilization,
                total_capacity_tons: overview.total_capacity_tons,
                current_volume_tons: round2(current_volume_tons),
            },
            readings: ReadingKpis {
                average_temperature,
                average_humidity,
                total_readings_24h: count,
            },
            alerts: AlertKpis {
                active: state.active_alerts,
                critical: state.critical_alerts,
                resolved: state.resolved_alerts,
                recent_7_days: state.recent_alerts.len(),
            },
            timestamp: now,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Round to two decimal places, matching the consuming dashboard's format.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
