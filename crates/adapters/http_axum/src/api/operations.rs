//! JSON REST handlers for starting and stopping operations.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use labsim_domain::error::{LabSimError, ValidationError};
use labsim_domain::id::OperationId;
use labsim_domain::operation::{OperationRecord, OperationRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for a stopped operation.
#[derive(Serialize)]
pub struct StopOperationResponse {
    pub status: String,
}

/// `POST /devices/{id}/operations`
pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<OperationRecord>, ApiError> {
    let simulator = state.registry.get(&id)?;
    let record = simulator.start_operation(&request)?;
    Ok(Json(record))
}

/// `DELETE /devices/{id}/operations/{operation_id}`
pub async fn stop(
    State(state): State<AppState>,
    Path((id, operation_id)): Path<(String, String)>,
) -> Result<Json<StopOperationResponse>, ApiError> {
    let simulator = state.registry.get(&id)?;
    let operation_id = OperationId::from_str(&operation_id)
        .map_err(|_| ApiError::from(LabSimError::from(ValidationError::MalformedId(operation_id))))?;
    simulator.stop_operation(operation_id).await?;
    Ok(Json(StopOperationResponse {
        status: "stopped".to_string(),
    }))
}
