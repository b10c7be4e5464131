//! Per-silo alert lifecycle state machine.
//!
//! An [`AlertBook`] owns every alert ever raised for one silo and enforces
//! the transition rules:
//!
//! - none → active: a fresh breach with no active alert of that type.
//! - active → active: persisting breach refreshes severity/value in place.
//! - active/acknowledged → resolved: the breach cleared (hysteresis
//!   applied by the evaluator) or an operator resolved manually.
//! - active/acknowledged → acknowledged: explicit operator action only;
//!   does not clear the breach and does not block later resolution.
//! - resolved is terminal: a fresh breach opens a new alert with a new id.
//!
//! At most one non-resolved alert exists per alert type. Callers hold the
//! silo's writer lock, so the book itself needs no synchronisation.

use std::collections::HashMap;

use granary_core::error::CoreError;
use granary_core::severity::{AlertType, BreachState, PriorActive};
use granary_core::types::{AlertId, SiloId, Timestamp};
use granary_core::{Alert, AlertStatus};
use granary_events::MonitorEvent;

/// All alerts for one silo, with the per-type active index.
#[derive(Default)]
pub struct AlertBook {
    /// The currently non-resolved alert per dimension, if any.
    active: HashMap<AlertType, AlertId>,
    /// Every alert raised for this silo, active and resolved.
    alerts: HashMap<AlertId, Alert>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Which dimensions currently have a non-resolved alert, as input for
    /// the evaluator's hysteresis decision.
    pub fn prior_active(&self) -> PriorActive {
        PriorActive {
            temperature: self.active.contains_key(&AlertType::Temperature),
            humidity: self.active.contains_key(&AlertType::Humidity),
            volume: self.active.contains_key(&AlertType::Volume),
        }
    }

    /// Apply one evaluator verdict, returning the resulting transition
    /// event, if any.
    pub fn apply(
        &mut self,
        silo_id: SiloId,
        breach: &BreachState,
        at: Timestamp,
    ) -> Option<MonitorEvent> {
        let existing = self.active.get(&breach.alert_type).copied();

        match (existing, breach.active) {
            (None, true) => {
                let severity = breach.severity?;
                let alert = Alert::open(silo_id, breach, severity, at);
                self.active.insert(breach.alert_type, alert.id);
                self.alerts.insert(alert.id, alert.clone());
                Some(MonitorEvent::AlertCreated { alert })
            }
            (Some(id), true) => {
                let severity = breach.severity?;
                let alert = self.alerts.get_mut(&id)?;
                let previous_severity = alert.severity;
                alert.refresh(breach, severity);
                Some(MonitorEvent::AlertUpdated {
                    alert: alert.clone(),
                    previous_severity,
                })
            }
            (Some(id), false) => {
                let alert = self.resolve_by_id(id, at)?;
                Some(MonitorEvent::AlertResolved { alert })
            }
            (None, false) => None,
        }
    }

    /// Explicit operator acknowledgment.
    ///
    /// Acknowledging an already-acknowledged alert is a no-op that returns
    /// the alert without emitting another event.
    pub fn acknowledge(
        &mut self,
        id: AlertId,
    ) -> Result<(Alert, Option<MonitorEvent>), CoreError> {
        let alert = self
            .alerts
            .get_mut(&id)
            .ok_or(CoreError::AlertNotFound(id))?;

        match alert.status {
            AlertStatus::Resolved => Err(CoreError::AlertAlreadyResolved(id)),
            AlertStatus::Acknowledged => Ok((alert.clone(), None)),
            AlertStatus::Active => {
                alert.status = AlertStatus::Acknowledged;
                let alert = alert.clone();
                let event = MonitorEvent::AlertAcknowledged {
                    alert: alert.clone(),
                };
                Ok((alert, Some(event)))
            }
        }
    }

    /// Explicit operator resolution, independent of the breach state.
    pub fn resolve(
        &mut self,
        id: AlertId,
        at: Timestamp,
    ) -> Result<(Alert, MonitorEvent), CoreError> {
        let status = self
            .alerts
            .get(&id)
            .map(|a| a.status)
            .ok_or(CoreError::AlertNotFound(id))?;
        if status == AlertStatus::Resolved {
            return Err(CoreError::AlertAlreadyResolved(id));
        }

        let alert = self
            .resolve_by_id(id, at)
            .ok_or(CoreError::AlertNotFound(id))?;
        let event = MonitorEvent::AlertResolved {
            alert: alert.clone(),
        };
        Ok((alert, event))
    }

    /// One alert by id.
    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.get(&id)
    }

    /// All alerts for this silo, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    /// Mark an alert resolved and drop it from the active index.
    fn resolve_by_id(&mut self, id: AlertId, at: Timestamp) -> Option<Alert> {
        let alert = self.alerts.get_mut(&id)?;
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(at);
        self.active.remove(&alert.alert_type);
        Some(alert.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
