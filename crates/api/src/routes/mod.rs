pub mod health;

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /silos                      register silo (POST), fleet summary (GET)
/// /silos/{id}/thresholds      update thresholds (PUT)
/// /silos/{id}/readings        submit sensor reading (POST)
///
/// /dashboard/kpis             KPI snapshot (GET)
///
/// /alerts                     list alerts with filters (GET)
/// /alerts/{id}                alert detail (GET)
/// /alerts/{id}/acknowledge    operator acknowledge (POST)
/// /alerts/{id}/resolve        operator resolve (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // -- Silos --
        .route(
            "/silos",
            post(handlers::silos::register_silo).get(handlers::silos::list_silos),
        )
        .route(
            "/silos/{id}/thresholds",
            put(handlers::silos::set_thresholds),
        )
        .route(
            "/silos/{id}/readings",
            post(handlers::silos::submit_reading),
        )
        // -- Dashboard --
        .route("/dashboard/kpis", get(handlers::dashboard::get_kpis))
        // -- Alerts --
        .route("/alerts", get(handlers::alerts::list_alerts))
        .route("/alerts/{id}", get(handlers::alerts::get_alert))
        .route(
            "/alerts/{id}/acknowledge",
            post(handlers::alerts::acknowledge_alert),
        )
        .route(
            "/alerts/{id}/resolve",
            post(handlers::alerts::resolve_alert),
        )
}
