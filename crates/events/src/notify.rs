//! Pluggable alert notification fan-out.
//!
//! [`NotificationRouter`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and offers every alert activation or severity escalation to a set of
//! [`Notifier`]s. Delivery is best-effort and fully decoupled from the
//! monitoring engine: the writer path publishes and moves on, and a failing
//! notifier is logged without affecting alert or KPI state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::MonitorEvent;
use crate::delivery::email::{EmailDelivery, EmailError};
use crate::delivery::webhook::{WebhookDelivery, WebhookError};

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Error type for a failed notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error(transparent)]
    Email(#[from] EmailError),

    /// Failure in a caller-supplied notifier implementation.
    #[error("Notification failed: {0}")]
    Other(String),
}

/// A pluggable external notification channel.
///
/// Implementations deliver one event and report failure via [`NotifyError`];
/// the router logs failures and carries on.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in log output (e.g. `"webhook"`).
    fn name(&self) -> &'static str;

    /// Deliver one event.
    async fn notify(&self, event: &MonitorEvent) -> Result<(), NotifyError>;
}

/// Notifier that POSTs events to a configured webhook URL.
pub struct WebhookNotifier {
    delivery: WebhookDelivery,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            delivery: WebhookDelivery::new(),
            url,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, event: &MonitorEvent) -> Result<(), NotifyError> {
        self.delivery.deliver(&self.url, event).await?;
        Ok(())
    }
}

/// Notifier that emails events to a configured operator address.
pub struct EmailNotifier {
    delivery: EmailDelivery,
    to_address: String,
}

impl EmailNotifier {
    pub fn new(delivery: EmailDelivery, to_address: String) -> Self {
        Self {
            delivery,
            to_address,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn notify(&self, event: &MonitorEvent) -> Result<(), NotifyError> {
        self.delivery.deliver(&self.to_address, event).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NotificationRouter
// ---------------------------------------------------------------------------

/// Background service that fans notifiable events out to all configured
/// channels.
pub struct NotificationRouter {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationRouter {
    /// Create a router over the given notification channels.
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Run the routing loop.
    ///
    /// Exits when the bus sender is dropped or the [`CancellationToken`] is
    /// cancelled. Lagging behind the bus only skips events — notification
    /// delivery is best-effort by contract.
    pub async fn run(self, mut receiver: broadcast::Receiver<MonitorEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Notification router cancelled");
                    break;
                }
                result = receiver.recv() => match result {
                    Ok(event) => {
                        if event.is_notifiable() {
                            self.dispatch(&event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Notification router lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification router shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Offer one event to every channel, logging failures.
    async fn dispatch(&self, event: &MonitorEvent) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(event).await {
                tracing::warn!(
                    channel = notifier.name(),
                    event = event.event_name(),
                    silo_id = event.silo_id(),
                    error = %e,
                    "Notifier failed, alert state unaffected"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use granary_core::severity::{AlertType, BreachState};
    use granary_core::{Alert, Severity};
    use tokio::sync::mpsc;

    use crate::bus::EventBus;

    use super::*;

    /// Notifier that records every delivered event name on a channel.
    struct RecordingNotifier {
        tx: mpsc::UnboundedSender<&'static str>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn notify(&self, event: &MonitorEvent) -> Result<(), NotifyError> {
            self.tx
                .send(event.event_name())
                .map_err(|e| NotifyError::Other(e.to_string()))?;
            if self.fail {
                return Err(NotifyError::Other("synthetic failure".to_string()));
            }
            Ok(())
        }
    }

    fn sample_alert(severity: Severity) -> Alert {
        let breach = BreachState {
            alert_type: AlertType::Humidity,
            active: true,
            severity: Some(severity),
            value: 80.0,
            threshold: 75.0,
        };
        Alert::open(3, &breach, severity, Utc::now())
    }

    #[tokio::test]
    async fn forwards_only_notifiable_events() {
        let bus = EventBus::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = NotificationRouter::new(vec![Arc::new(RecordingNotifier { tx, fail: false })]);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(router.run(bus.subscribe(), cancel.clone()));

        bus.publish(MonitorEvent::AlertCreated {
            alert: sample_alert(Severity::Medium),
        });
        // Value refresh — not notifiable.
        bus.publish(MonitorEvent::AlertUpdated {
            alert: sample_alert(Severity::Medium),
            previous_severity: Severity::Medium,
        });
        bus.publish(MonitorEvent::AlertUpdated {
            alert: sample_alert(Severity::Critical),
            previous_severity: Severity::Medium,
        });
        bus.publish(MonitorEvent::AlertResolved {
            alert: sample_alert(Severity::Critical),
        });

        assert_eq!(rx.recv().await, Some("alert.created"));
        assert_eq!(rx.recv().await, Some("alert.updated"));

        cancel.cancel();
        handle.await.expect("router task should join");

        // Nothing else was delivered.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_notifier_does_not_stop_the_router() {
        let bus = EventBus::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let router = NotificationRouter::new(vec![Arc::new(RecordingNotifier { tx, fail: true })]);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(router.run(bus.subscribe(), cancel.clone()));

        bus.publish(MonitorEvent::AlertCreated {
            alert: sample_alert(Severity::High),
        });
        bus.publish(MonitorEvent::AlertCreated {
            alert: sample_alert(Severity::Critical),
        });

        // Both events are still offered despite the first failure.
        assert_eq!(rx.recv().await, Some("alert.created"));
        assert_eq!(rx.recv().await, Some("alert.created"));

        cancel.cancel();
        handle.await.expect("router task should join");
    }
}
