//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`MonitorEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` between the monitoring engine
//! (publisher) and its consumers (aggregation taps, notification router,
//! tests).
//!
//! The engine publishes a silo's events while holding that silo's writer
//! lock, so subscribers observe the events of any one silo in transition
//! order. No ordering is guaranteed across silos.

use serde::Serialize;
use tokio::sync::broadcast;

use granary_core::severity::Severity;
use granary_core::types::{SiloId, Timestamp};
use granary_core::Alert;

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// A domain event emitted by the monitoring engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A new breach opened an alert.
    AlertCreated { alert: Alert },
    /// A persisting breach refreshed an existing alert's severity/value.
    AlertUpdated {
        alert: Alert,
        previous_severity: Severity,
    },
    /// An operator acknowledged an alert. The underlying breach persists.
    AlertAcknowledged { alert: Alert },
    /// The breach cleared (or an operator resolved the alert manually).
    AlertResolved { alert: Alert },
    /// A raw sensor sample was dropped by the normalizer.
    ReadingRejected {
        silo_id: SiloId,
        reason: String,
        timestamp: Timestamp,
    },
}

impl MonitorEvent {
    /// Dot-separated event name, e.g. `"alert.created"`.
    pub fn event_name(&self) -> &'static str {
        match self {
            MonitorEvent::AlertCreated { .. } => "alert.created",
            MonitorEvent::AlertUpdated { .. } => "alert.updated",
            MonitorEvent::AlertAcknowledged { .. } => "alert.acknowledged",
            MonitorEvent::AlertResolved { .. } => "alert.resolved",
            MonitorEvent::ReadingRejected { .. } => "reading.rejected",
        }
    }

    /// The silo this event concerns.
    pub fn silo_id(&self) -> SiloId {
        match self {
            MonitorEvent::AlertCreated { alert }
            | MonitorEvent::AlertAcknowledged { alert }
            | MonitorEvent::AlertResolved { alert }
            | MonitorEvent::AlertUpdated { alert, .. } => alert.silo_id,
            MonitorEvent::ReadingRejected { silo_id, .. } => *silo_id,
        }
    }

    /// Whether this event should be offered to external notifiers.
    ///
    /// Only alert activations and severity escalations go out; value
    /// refreshes, de-escalations, acknowledgments, and resolutions stay
    /// internal.
    pub fn is_notifiable(&self) -> bool {
        match self {
            MonitorEvent::AlertCreated { .. } => true,
            MonitorEvent::AlertUpdated {
                alert,
                previous_severity,
            } => alert.severity > *previous_severity,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`MonitorEvent`].
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no active subscribers the event is silently dropped —
    /// publishing never blocks and never fails the writer path.
    pub fn publish(&self, event: MonitorEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
