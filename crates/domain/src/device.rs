//! Device configuration — type, simulation mode, and tuning knobs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Device type, open on the wire.
///
/// The four known types get tailored signal profiles; any other string
/// (including `"custom"`) is accepted as-is and resolves to the generic
/// fallback profile. The raw name is kept so device ids and serialized
/// configs round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Pump,
    TemperatureController,
    Balance,
    Stirrer,
    /// Any type string without a dedicated profile.
    Other(String),
}

impl DeviceType {
    /// The wire name, also used as the device-id prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pump => "pump",
            Self::TemperatureController => "temperature_controller",
            Self::Balance => "balance",
            Self::Stirrer => "stirrer",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pump" => Self::Pump,
            "temperature_controller" => Self::TemperatureController,
            "balance" => Self::Balance,
            "stirrer" => Self::Stirrer,
            _ => Self::Other(value),
        }
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation variability mode.
///
/// Affects operation duration and whether failures are injected:
/// `Fast` halves the base delay, `Unstable` jitters it and may fail,
/// `Custom` behaves like `Normal` for timing purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    #[default]
    Normal,
    Fast,
    Unstable,
    Custom,
}

/// Current device status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Idle,
    Busy,
    Error,
    Maintenance,
    Offline,
}

impl DeviceStatus {
    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Maintenance => "maintenance",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning knobs for simulated behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base delay for operations in seconds.
    pub operation_delay: f64,
    /// Probability of operation failure (0–1), only drawn in unstable mode.
    pub error_probability: f64,
    /// Interval between telemetry emissions in seconds.
    pub data_update_interval: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            operation_delay: 1.0,
            error_probability: 0.1,
            data_update_interval: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Check the numeric ranges documented on each field.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] for the first field outside
    /// its range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.operation_delay <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "operation_delay",
                requirement: "greater than zero",
                value: self.operation_delay,
            });
        }
        if !(0.0..=1.0).contains(&self.error_probability) {
            return Err(ValidationError::OutOfRange {
                field: "error_probability",
                requirement: "within [0, 1]",
                value: self.error_probability,
            });
        }
        if self.data_update_interval <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "data_update_interval",
                requirement: "greater than zero",
                value: self.data_update_interval,
            });
        }
        Ok(())
    }
}

/// Immutable configuration of one simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_type: DeviceType,
    #[serde(default)]
    pub mode: DeviceMode,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub simulation_config: Option<SimulationConfig>,
}

impl DeviceConfig {
    /// Create a builder for constructing a [`DeviceConfig`].
    #[must_use]
    pub fn builder(device_type: DeviceType) -> DeviceConfigBuilder {
        DeviceConfigBuilder {
            device_type,
            mode: DeviceMode::default(),
            capabilities: Vec::new(),
            parameters: HashMap::new(),
            simulation_config: None,
        }
    }

    /// Check the embedded simulation config, when present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] propagated from
    /// [`SimulationConfig::validate`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(sim) = &self.simulation_config {
            sim.validate()?;
        }
        Ok(())
    }
}

/// Step-by-step builder for [`DeviceConfig`].
#[derive(Debug)]
pub struct DeviceConfigBuilder {
    device_type: DeviceType,
    mode: DeviceMode,
    capabilities: Vec<String>,
    parameters: HashMap<String, serde_json::Value>,
    simulation_config: Option<SimulationConfig>,
}

impl DeviceConfigBuilder {
    #[must_use]
    pub fn mode(mut self, mode: DeviceMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    #[must_use]
    pub fn parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn simulation_config(mut self, sim: SimulationConfig) -> Self {
        self.simulation_config = Some(sim);
        self
    }

    /// Finalize the config.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] if the simulation config
    /// fields are outside their documented ranges.
    pub fn build(self) -> Result<DeviceConfig, ValidationError> {
        let config = DeviceConfig {
            device_type: self.device_type,
            mode: self.mode,
            capabilities: self.capabilities,
            parameters: self.parameters,
            simulation_config: self.simulation_config,
        };
        config.validate()?;
        Ok(config)
    }
}
