//! # labsim-adapter-http-axum
//!
//! HTTP adapter serving the device-farm REST API, consuming the core
//! command API 1:1:
//!
//! | Method & path | Core call |
//! |---|---|
//! | `POST /devices` | create |
//! | `GET /devices` | status of all devices |
//! | `GET /devices/{id}/status` | status |
//! | `POST /devices/{id}/operations` | start operation |
//! | `DELETE /devices/{id}/operations/{op_id}` | stop operation |
//! | `DELETE /devices/{id}` | delete |
//! | `GET /health` | — |
//!
//! ## Dependency rule
//! Depends on `labsim-app` (registry, simulator) and `labsim-domain` only.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
