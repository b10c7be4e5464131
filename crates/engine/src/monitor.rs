//! The monitoring facade.
//!
//! [`Monitor`] owns all runtime state and exposes the boundary operations:
//! reading submission, threshold configuration, KPI snapshots, alert
//! queries, and operator acknowledge/resolve.
//!
//! Concurrency model: state is partitioned by silo. Each silo's alert book
//! and ordering cursor live behind their own mutex, so readings for
//! different silos are processed fully in parallel while readings for one
//! silo go through a single writer in timestamp order — the hysteresis and
//! single-active-alert invariants depend on observing breach transitions in
//! order. The KPI aggregator is the only cross-silo shared state and takes
//! its own short-held lock. Events for a silo are published while its
//! writer lock is held, which gives subscribers a per-silo total order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use granary_core::error::CoreError;
use granary_core::reading::{normalize, Normalized, RawReading, Reading};
use granary_core::severity::{evaluate_reading, AlertType, Severity};
use granary_core::thresholds::SiloThresholds;
use granary_core::types::{AlertId, SiloId, Timestamp};
use granary_core::{Alert, AlertStatus};
use granary_events::{EventBus, MonitorEvent};

use crate::aggregate::{KpiAggregator, KpiSnapshot};
use crate::lifecycle::AlertBook;
use crate::registry::{SiloConfig, SiloRegistry};

/// Default cap on alert listing results.
const DEFAULT_LIST_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Facade types
// ---------------------------------------------------------------------------

/// Result of submitting a reading that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitOutcome {
    /// The reading was admitted and evaluated.
    Admitted,
    /// The reading duplicated the last accepted timestamp and was dropped.
    Duplicate,
}

/// Operator action on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Acknowledge,
    Resolve,
}

/// Filter for alert listings. All fields are conjunctive; `None` matches
/// everything.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AlertFilter {
    pub silo_id: Option<SiloId>,
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    pub alert_type: Option<AlertType>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    fn matches(&self, alert: &Alert) -> bool {
        self.silo_id.is_none_or(|id| alert.silo_id == id)
            && self.status.is_none_or(|s| alert.status == s)
            && self.severity.is_none_or(|s| alert.severity == s)
            && self.alert_type.is_none_or(|t| alert.alert_type == t)
    }
}

/// Per-silo status row for the fleet listing.
#[derive(Debug, Clone, Serialize)]
pub struct SiloSummary {
    pub silo_id: SiloId,
    pub name: String,
    pub status: crate::registry::SiloStatus,
    pub capacity_tons: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub volume_percent: Option<f64>,
    pub current_volume_tons: Option<f64>,
    pub active_alerts: usize,
    pub last_reading: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Mutable per-silo state, guarded by that silo's writer lock.
struct SiloState {
    /// Timestamp of the newest accepted reading, for ordering and
    /// duplicate checks.
    last_timestamp: Option<Timestamp>,
    /// The newest accepted reading, for the fleet listing.
    latest: Option<Reading>,
    book: AlertBook,
}

impl SiloState {
    fn new() -> Self {
        Self {
            last_timestamp: None,
            latest: None,
            book: AlertBook::new(),
        }
    }
}

/// The condition-monitoring and alerting engine.
pub struct Monitor {
    registry: SiloRegistry,
    shards: RwLock<HashMap<SiloId, Arc<Mutex<SiloState>>>>,
    /// Maps every alert id to its owning silo, for id-based lookups.
    alert_index: RwLock<HashMap<AlertId, SiloId>>,
    aggregator: KpiAggregator,
    bus: Arc<EventBus>,
}

impl Monitor {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            registry: SiloRegistry::new(),
            shards: RwLock::new(HashMap::new()),
            alert_index: RwLock::new(HashMap::new()),
            aggregator: KpiAggregator::new(),
            bus,
        }
    }

    /// Register or replace a silo's configuration.
    pub fn register_silo(&self, config: SiloConfig) -> Result<(), CoreError> {
        let silo_id = config.silo_id;
        self.registry.register(config)?;
        tracing::info!(silo_id, "Silo registered");
        Ok(())
    }

    /// Update a silo's alerting thresholds. Applies to subsequent readings
    /// only — past readings are never re-evaluated.
    pub fn set_thresholds(
        &self,
        silo_id: SiloId,
        thresholds: SiloThresholds,
    ) -> Result<(), CoreError> {
        self.registry.set_thresholds(silo_id, thresholds)?;
        tracing::info!(silo_id, "Thresholds updated");
        Ok(())
    }

    /// Submit one raw sensor sample.
    ///
    /// The full evaluation pipeline runs under the silo's writer lock:
    /// normalize → evaluate against a threshold snapshot → apply lifecycle
    /// transitions → fold into the KPI aggregator → publish events.
    /// Rejection drops the one sample, emits `reading.rejected`, and
    /// returns the error to the submitter; it never affects other readings.
    pub fn submit_reading(&self, raw: RawReading) -> Result<SubmitOutcome, CoreError> {
        let silo_id = raw.silo_id;
        let raw_timestamp = raw.timestamp;
        let cell = self.shard(silo_id);
        let mut state = lock(&cell);

        let reading = match normalize(raw, state.last_timestamp) {
            Ok(Normalized::Accepted(reading)) => reading,
            Ok(Normalized::Duplicate) => {
                tracing::debug!(silo_id, "Duplicate reading dropped");
                return Ok(SubmitOutcome::Duplicate);
            }
            Err(e) => {
                tracing::warn!(silo_id, error = %e, "Reading rejected");
                self.bus.publish(MonitorEvent::ReadingRejected {
                    silo_id,
                    reason: e.to_string(),
                    timestamp: raw_timestamp.unwrap_or_else(Utc::now),
                });
                return Err(e);
            }
        };

        let config = self.registry.get(silo_id);

        // Thresholds missing: skip evaluation, but the reading still
        // contributes to the rolling aggregates below.
        let events: Vec<MonitorEvent> = match &config {
            Some(config) => {
                let breaches =
                    evaluate_reading(&reading, &config.thresholds, state.book.prior_active());
                breaches
                    .iter()
                    .filter_map(|b| state.book.apply(silo_id, b, reading.timestamp))
                    .collect()
            }
            None => {
                tracing::debug!(silo_id, "No thresholds registered, evaluation skipped");
                Vec::new()
            }
        };

        let effective_volume_tons = reading.volume_tons.or_else(|| {
            config
                .as_ref()
                .filter(|c| c.capacity_tons > 0.0)
                .map(|c| c.capacity_tons * reading.volume_percent / 100.0)
        });

        state.last_timestamp = Some(
            state
                .last_timestamp
                .map_or(reading.timestamp, |t| t.max(reading.timestamp)),
        );
        state.latest = Some(reading.clone());

        self.aggregator.record_reading(&reading, effective_volume_tons);

        for event in events {
            if let MonitorEvent::AlertCreated { alert } = &event {
                self.index_alert(alert.id, silo_id);
                tracing::info!(
                    silo_id,
                    alert_id = %alert.id,
                    severity = alert.severity.label(),
                    title = %alert.title,
                    "Alert created"
                );
            }
            self.aggregator.record_event(&event);
            self.bus.publish(event);
        }

        Ok(SubmitOutcome::Admitted)
    }

    /// One consistent KPI snapshot, as of now.
    pub fn snapshot(&self) -> KpiSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// One consistent KPI snapshot as of `now`. Deterministic companion of
    /// [`snapshot`](Self::snapshot) for replayed histories.
    pub fn snapshot_at(&self, now: Timestamp) -> KpiSnapshot {
        self.aggregator.snapshot(now, self.registry.overview())
    }

    /// Alerts matching `filter`, newest first.
    pub fn list_alerts(&self, filter: AlertFilter) -> Vec<Alert> {
        let cells: Vec<Arc<Mutex<SiloState>>> = {
            let shards = self.shards.read().unwrap_or_else(|e| e.into_inner());
            match filter.silo_id {
                Some(id) => shards.get(&id).cloned().into_iter().collect(),
                None => shards.values().cloned().collect(),
            }
        };

        let mut alerts: Vec<Alert> = Vec::new();
        for cell in cells {
            let state = lock(&cell);
            alerts.extend(state.book.iter().filter(|a| filter.matches(a)).cloned());
        }

        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts.truncate(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT));
        alerts
    }

    /// One alert by id.
    pub fn get_alert(&self, id: AlertId) -> Result<Alert, CoreError> {
        let cell = self.cell_for_alert(id)?;
        let state = lock(&cell);
        state
            .book
            .get(id)
            .cloned()
            .ok_or(CoreError::AlertNotFound(id))
    }

    /// Operator mutation: acknowledge or manually resolve an alert.
    pub fn resolve_or_acknowledge(
        &self,
        id: AlertId,
        action: AlertAction,
    ) -> Result<Alert, CoreError> {
        let cell = self.cell_for_alert(id)?;
        let mut state = lock(&cell);

        let (alert, event) = match action {
            AlertAction::Acknowledge => state.book.acknowledge(id)?,
            AlertAction::Resolve => {
                let (alert, event) = state.book.resolve(id, Utc::now())?;
                (alert, Some(event))
            }
        };

        if let Some(event) = event {
            tracing::info!(
                silo_id = alert.silo_id,
                alert_id = %id,
                event = event.event_name(),
                "Operator alert action"
            );
            self.aggregator.record_event(&event);
            self.bus.publish(event);
        }

        Ok(alert)
    }

    /// Per-silo status rows for every registered silo.
    pub fn silo_summaries(&self) -> Vec<SiloSummary> {
        let mut configs = self.registry.list();
        configs.sort_by_key(|c| c.silo_id);

        configs
            .into_iter()
            .map(|config| {
                let (latest, active_alerts) = match self.existing_shard(config.silo_id) {
                    Some(cell) => {
                        let state = lock(&cell);
                        let active = state
                            .book
                            .iter()
                            .filter(|a| a.status != AlertStatus::Resolved)
                            .count();
                        (state.latest.clone(), active)
                    }
                    None => (None, 0),
                };

                let current_volume_tons = latest.as_ref().and_then(|r| {
                    r.volume_tons.or_else(|| {
                        (config.capacity_tons > 0.0)
                            .then(|| config.capacity_tons * r.volume_percent / 100.0)
                    })
                });

                SiloSummary {
                    silo_id: config.silo_id,
                    name: config.name,
                    status: config.status,
                    capacity_tons: config.capacity_tons,
                    temperature: latest.as_ref().map(|r| r.temperature),
                    humidity: latest.as_ref().map(|r| r.humidity),
                    volume_percent: latest.as_ref().map(|r| r.volume_percent),
                    current_volume_tons,
                    active_alerts,
                    last_reading: latest.as_ref().map(|r| r.timestamp),
                }
            })
            .collect()
    }

    /// The shard cell for a silo, created on first use.
    fn shard(&self, silo_id: SiloId) -> Arc<Mutex<SiloState>> {
        if let Some(cell) = self.existing_shard(silo_id) {
            return cell;
        }
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            shards
                .entry(silo_id)
                .or_insert_with(|| Arc::new(Mutex::new(SiloState::new()))),
        )
    }

    fn existing_shard(&self, silo_id: SiloId) -> Option<Arc<Mutex<SiloState>>> {
        self.shards
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&silo_id)
            .cloned()
    }

    /// Resolve an alert id to its silo's shard cell.
    ///
    /// The index guard is dropped before the shard lock is taken, keeping
    /// the lock order acyclic with the submit path.
    fn cell_for_alert(&self, id: AlertId) -> Result<Arc<Mutex<SiloState>>, CoreError> {
        let silo_id = self
            .alert_index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .copied()
            .ok_or(CoreError::AlertNotFound(id))?;
        self.existing_shard(silo_id)
            .ok_or(CoreError::AlertNotFound(id))
    }

    fn index_alert(&self, id: AlertId, silo_id: SiloId) {
        self.alert_index
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, silo_id);
    }
}

/// Lock a silo cell, recovering the guard from a poisoned mutex. The state
/// behind it is only ever left mid-update by a panicking test assertion,
/// never by the engine itself.
fn lock(cell: &Mutex<SiloState>) -> MutexGuard<'_, SiloState> {
    cell.lock().unwrap_or_else(|e| e.into_inner())
}
