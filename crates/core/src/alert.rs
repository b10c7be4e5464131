//! The alert entity.
//!
//! Alerts are keyed by silo id — never by reference back into silo state —
//! and carry everything a consumer needs to render them. Titles and
//! descriptions are generated deterministically from the dimension and
//! severity so that repeated breaches of the same kind read identically.

use serde::{Deserialize, Serialize};

use crate::severity::{AlertType, BreachState, Severity};
use crate::types::{AlertId, SiloId, Timestamp};

/// Lifecycle state of an alert.
///
/// `Active` and `Acknowledged` both describe an unresolved condition;
/// acknowledgment records that an operator has seen the alert and does not
/// clear the underlying breach. `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

/// A single threshold-violation alert for one silo and dimension.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Generated once at creation; stable across updates.
    pub id: AlertId,
    pub silo_id: SiloId,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    /// The triggering reading's measurement (refreshed while the breach
    /// persists).
    pub value: f64,
    /// The limit compared against.
    pub threshold: f64,
    pub created_at: Timestamp,
    /// Absent until the alert resolves.
    pub resolved_at: Option<Timestamp>,
}

impl Alert {
    /// Open a new alert from an active breach.
    pub fn open(silo_id: SiloId, breach: &BreachState, severity: Severity, at: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            silo_id,
            alert_type: breach.alert_type,
            severity,
            status: AlertStatus::Active,
            title: alert_title(breach.alert_type, severity),
            description: alert_description(breach.alert_type, severity),
            value: breach.value,
            threshold: breach.threshold,
            created_at: at,
            resolved_at: None,
        }
    }

    /// Refresh severity, value, and threshold from a persisting breach.
    ///
    /// Id, creation time, and status are untouched.
    pub fn refresh(&mut self, breach: &BreachState, severity: Severity) {
        self.severity = severity;
        self.value = breach.value;
        self.threshold = breach.threshold;
        self.title = alert_title(self.alert_type, severity);
        self.description = alert_description(self.alert_type, severity);
    }
}

/// Deterministic alert title for a dimension and severity.
pub fn alert_title(alert_type: AlertType, severity: Severity) -> String {
    match (alert_type, severity) {
        (AlertType::Volume, Severity::Critical) => "Critical Low Volume Alert".to_string(),
        (AlertType::Volume, _) => "Low Volume Alert".to_string(),
        (ty, Severity::Low) => format!("Rising {} Warning", ty.label()),
        (ty, Severity::Critical) => format!("Critical {} Alert", ty.label()),
        (ty, _) => format!("High {} Alert", ty.label()),
    }
}

/// Deterministic alert description for a dimension and severity.
pub fn alert_description(alert_type: AlertType, severity: Severity) -> String {
    match (alert_type, severity) {
        (AlertType::Volume, Severity::Critical) => {
            "Volume is critically low - refill needed".to_string()
        }
        (AlertType::Volume, _) => "Volume is low - plan a refill".to_string(),
        (ty, Severity::Low) => format!("{} is approaching the safe threshold", ty.label()),
        (ty, Severity::Critical) => format!("{} critically exceeded the safe threshold", ty.label()),
        (ty, _) => format!("{} exceeded safe threshold", ty.label()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
