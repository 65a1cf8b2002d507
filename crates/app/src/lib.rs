//! # labsim-app
//!
//! Application layer — the simulator core.
//!
//! ## Responsibilities
//! - [`simulator::DeviceSimulator`] — per-device state machine owning the
//!   active operation task and the bounded telemetry/error histories
//! - [`registry::DeviceRegistry`] — id → simulator map with per-type id
//!   allocation; the only shared structure needing its own lock
//! - [`interface::CommandInterface`] — the abstract
//!   connect/disconnect/start/stop/status/reset contract layered atop the
//!   simulator, with per-type required-parameter validation
//!
//! ## Dependency rule
//! Depends on `labsim-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod interface;
pub mod registry;
pub mod simulator;
