use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// Cheaply cloneable — everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The monitoring engine.
    pub monitor: Arc<granary_engine::Monitor>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus carrying alert lifecycle events.
    pub event_bus: Arc<granary_events::EventBus>,
}
