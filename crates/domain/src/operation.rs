//! Operation requests and records.
//!
//! An operation is one bounded unit of simulated device work: started
//! through the command API, executed by a cancellable background task, and
//! described to the caller by an [`OperationRecord`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::OperationId;
use crate::time::Timestamp;

/// Supported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Start,
    Stop,
    Pause,
    Resume,
    Reset,
}

/// Request to start a device operation.
///
/// `parameters` and `timeout` are opaque to the simulation: they are echoed
/// back in the record and otherwise unused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation_type: OperationType,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub timeout: Option<f64>,
}

impl OperationRequest {
    /// A start request with the given parameters.
    #[must_use]
    pub fn start(parameters: HashMap<String, serde_json::Value>) -> Self {
        Self {
            operation_type: OperationType::Start,
            parameters,
            timeout: None,
        }
    }
}

/// Snapshot of a freshly started operation, returned to the caller.
///
/// Ephemeral: lives only as long as the task it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub operation_id: OperationId,
    pub status: String,
    pub start_time: Timestamp,
    pub estimated_completion: Timestamp,
    pub parameters: HashMap<String, serde_json::Value>,
}
