//! Handlers for dashboard KPIs.

use axum::extract::State;
use axum::Json;

use granary_engine::KpiSnapshot;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /dashboard/kpis
///
/// One consistent KPI snapshot. Always at least as fresh as the last
/// fully-applied reading or alert transition.
pub async fn get_kpis(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<KpiSnapshot>>> {
    let snapshot = state.monitor.snapshot();
    Ok(Json(DataResponse { data: snapshot }))
}
