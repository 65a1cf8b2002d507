//! Common error types used across the workspace.
//!
//! Each failure class gets its own typed error; [`LabSimError`] is the
//! umbrella enum the command API returns, with `#[from]` conversions so
//! call sites can use `?` on the specific type.

/// Umbrella error for the simulator command API.
#[derive(Debug, thiserror::Error)]
pub enum LabSimError {
    /// Malformed or out-of-range input; never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Start attempted while an operation is already active.
    #[error(transparent)]
    DeviceBusy(#[from] DeviceBusyError),

    /// Unknown device or operation identifier.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Simulated hardware fault.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

/// Malformed or out-of-range input.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A parameter required by the device type was not supplied.
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    /// A numeric field is outside its allowed range.
    #[error("`{field}` must be {requirement} (got {value})")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    /// An identifier in a request could not be parsed.
    #[error("malformed identifier `{0}`")]
    MalformedId(String),

    /// The command is not valid for the device's current state.
    #[error("device is in `{status}` state; {hint}")]
    WrongState {
        status: &'static str,
        hint: &'static str,
    },
}

/// The device already has an active operation.
#[derive(Debug, thiserror::Error)]
#[error("device `{device_id}` is busy with operation {operation_id}")]
pub struct DeviceBusyError {
    pub device_id: String,
    pub operation_id: crate::id::OperationId,
}

/// Lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Simulated hardware fault raised by the failure injector.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HardwareError {
    pub message: String,
}
