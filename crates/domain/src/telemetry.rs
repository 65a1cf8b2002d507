//! Telemetry readings and error records emitted by running operations.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// A single simulated sensor value.
///
/// Most signals are floats; the balance's `stability` signal is boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Float(f64),
    Bool(bool),
}

/// One timestamped reading of a named signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub timestamp: Timestamp,
    pub signal: String,
    pub value: TelemetryValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Well-known device error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    OperationCancelled,
    OperationFailed,
}

/// A structured entry in a device's error history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorRecord {
    /// Record an explicit cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            code: ErrorCode::OperationCancelled,
            message: "Operation was cancelled".to_string(),
            timestamp: crate::time::now(),
            details: None,
        }
    }

    /// Record an injected failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::OperationFailed,
            message: message.into(),
            timestamp: crate::time::now(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_error_code_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::OperationCancelled).unwrap();
        assert_eq!(json, "\"OPERATION_CANCELLED\"");
    }

    #[test]
    fn should_serialize_float_value_as_bare_number() {
        let reading = TelemetryReading {
            timestamp: crate::time::now(),
            signal: "flow_rate".to_string(),
            value: TelemetryValue::Float(4.2),
            unit: Some("mL/min".to_string()),
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["value"], serde_json::json!(4.2));
        assert_eq!(json["unit"], serde_json::json!("mL/min"));
    }

    #[test]
    fn should_omit_unit_when_absent() {
        let reading = TelemetryReading {
            timestamp: crate::time::now(),
            signal: "custom_value".to_string(),
            value: TelemetryValue::Float(0.5),
            unit: None,
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert!(json.get("unit").is_none());
    }

    #[test]
    fn should_build_failure_record_with_message() {
        let record = ErrorRecord::failed("Simulated operation failure");
        assert_eq!(record.code, ErrorCode::OperationFailed);
        assert_eq!(record.message, "Simulated operation failure");
    }
}
