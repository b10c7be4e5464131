//! Granary event bus and notification infrastructure.
//!
//! Building blocks for fanning alert lifecycle transitions out of the
//! monitoring engine:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`MonitorEvent`] — the canonical domain event.
//! - [`delivery`] — external delivery channels (webhook, email).
//! - [`NotificationRouter`] — background task that offers alert
//!   activations and escalations to pluggable [`Notifier`]s.

pub mod bus;
pub mod delivery;
pub mod notify;

pub use bus::{EventBus, MonitorEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::webhook::WebhookDelivery;
pub use notify::{EmailNotifier, NotificationRouter, Notifier, NotifyError, WebhookNotifier};
