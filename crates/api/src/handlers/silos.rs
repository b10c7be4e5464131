//! Handlers for silo configuration and reading ingestion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use granary_core::reading::RawReading;
use granary_core::thresholds::SiloThresholds;
use granary_core::types::{SiloId, Timestamp};
use granary_engine::{SiloConfig, SiloStatus, SiloSummary, SubmitOutcome};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for silo registration.
#[derive(Debug, Deserialize)]
pub struct RegisterSiloRequest {
    pub silo_id: SiloId,
    pub name: String,
    pub capacity_tons: f64,
    /// Defaults to `active`.
    pub status: Option<SiloStatus>,
    /// Defaults to the standard grain-storage thresholds.
    pub thresholds: Option<SiloThresholds>,
}

/// Request body for a sensor reading. The silo id comes from the URL path,
/// as submitted by gateways and the simulator.
#[derive(Debug, Deserialize)]
pub struct ReadingRequest {
    pub timestamp: Option<Timestamp>,
    pub temperature: f64,
    pub humidity: f64,
    pub volume_percent: f64,
    pub volume_tons: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /silos
///
/// Register (or replace) a silo's configuration.
pub async fn register_silo(
    State(state): State<AppState>,
    Json(input): Json<RegisterSiloRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SiloConfig>>)> {
    let config = SiloConfig {
        silo_id: input.silo_id,
        name: input.name,
        capacity_tons: input.capacity_tons,
        status: input.status.unwrap_or(SiloStatus::Active),
        thresholds: input.thresholds.unwrap_or_default(),
    };
    state.monitor.register_silo(config.clone())?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: config })))
}

/// GET /silos
///
/// Status summary for every registered silo, including the latest reading
/// and active alert count.
pub async fn list_silos(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SiloSummary>>>> {
    let summaries = state.monitor.silo_summaries();
    Ok(Json(DataResponse { data: summaries }))
}

/// PUT /silos/{id}/thresholds
///
/// Update a silo's alerting thresholds. Applies to subsequent readings only.
pub async fn set_thresholds(
    State(state): State<AppState>,
    Path(silo_id): Path<SiloId>,
    Json(thresholds): Json<SiloThresholds>,
) -> AppResult<Json<DataResponse<SiloThresholds>>> {
    state.monitor.set_thresholds(silo_id, thresholds)?;
    Ok(Json(DataResponse { data: thresholds }))
}

/// POST /silos/{id}/readings
///
/// Submit one sensor reading (typically from IoT gateways or the
/// simulator). Invalid readings are rejected with 400 and never affect
/// other readings.
pub async fn submit_reading(
    State(state): State<AppState>,
    Path(silo_id): Path<SiloId>,
    Json(input): Json<ReadingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmitOutcome>>)> {
    let raw = RawReading {
        silo_id,
        timestamp: input.timestamp,
        temperature: input.temperature,
        humidity: input.humidity,
        volume_percent: input.volume_percent,
        volume_tons: input.volume_tons,
    };
    let outcome = state.monitor.submit_reading(raw)?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: outcome })))
}
