//! Handlers for alert queries and operator actions.

use axum::extract::{Path, Query, State};
use axum::Json;

use granary_core::types::AlertId;
use granary_core::Alert;
use granary_engine::{AlertAction, AlertFilter};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /alerts
///
/// List alerts, newest first, with optional filtering by silo, status,
/// severity, and type.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = state.monitor.list_alerts(filter);
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /alerts/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<AlertId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state.monitor.get_alert(alert_id)?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/acknowledge
///
/// Operator acknowledgment. Does not clear the underlying breach;
/// acknowledging a resolved alert is a 409 to the caller.
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<AlertId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state
        .monitor
        .resolve_or_acknowledge(alert_id, AlertAction::Acknowledge)?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /alerts/{id}/resolve
///
/// Manual operator resolution, independent of the breach state.
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<AlertId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = state
        .monitor
        .resolve_or_acknowledge(alert_id, AlertAction::Resolve)?;
    Ok(Json(DataResponse { data: alert }))
}
