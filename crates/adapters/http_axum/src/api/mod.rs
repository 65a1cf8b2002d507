//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
#[allow(clippy::missing_errors_doc)]
pub mod operations;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::state::AppState;

/// Build the device-farm sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(devices::list).post(devices::create))
        .route("/devices/{id}", delete(devices::delete))
        .route("/devices/{id}/status", get(devices::status))
        .route("/devices/{id}/operations", post(operations::start))
        .route(
            "/devices/{id}/operations/{operation_id}",
            delete(operations::stop),
        )
}
