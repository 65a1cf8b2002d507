//! # labsim-domain
//!
//! Pure domain model for the labsim instrument simulator.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **device configuration** (type, mode, capabilities, simulation tuning)
//! - Define **telemetry** and **error** records emitted by running operations
//! - Define **profiles** (data-driven signal generator tables per device type)
//! - Provide the bounded **ring buffer** backing telemetry/error histories
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.

pub mod error;
pub mod id;
pub mod time;

pub mod buffer;
pub mod device;
pub mod operation;
pub mod profile;
pub mod telemetry;
