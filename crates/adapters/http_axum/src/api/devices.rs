//! JSON REST handlers for device creation, status, and removal.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use labsim_app::simulator::StatusSnapshot;
use labsim_domain::device::DeviceConfig;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for a created device.
#[derive(Serialize)]
pub struct CreateDeviceResponse {
    pub device_id: String,
    pub status: String,
    pub config: DeviceConfig,
}

/// Response body for a deleted device.
#[derive(Serialize)]
pub struct DeleteDeviceResponse {
    pub status: String,
}

/// `POST /devices`
pub async fn create(
    State(state): State<AppState>,
    Json(config): Json<DeviceConfig>,
) -> Result<Json<CreateDeviceResponse>, ApiError> {
    let simulator = state.registry.create(config)?;
    Ok(Json(CreateDeviceResponse {
        device_id: simulator.id().to_string(),
        status: "created".to_string(),
        config: simulator.config().clone(),
    }))
}

/// `GET /devices/{id}/status`
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    let simulator = state.registry.get(&id)?;
    Ok(Json(simulator.status_snapshot()))
}

/// `GET /devices`
pub async fn list(
    State(state): State<AppState>,
) -> Json<HashMap<String, StatusSnapshot>> {
    Json(state.registry.snapshots())
}

/// `DELETE /devices/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDeviceResponse>, ApiError> {
    state.registry.delete(&id).await?;
    Ok(Json(DeleteDeviceResponse {
        status: "deleted".to_string(),
    }))
}
