//! Device profiles — data-driven signal generator tables per device type.
//!
//! Each device type maps to an ordered list of `(signal, unit, generator)`
//! entries interpreted by one shared evaluator. The mapping is total: every
//! [`DeviceType`] resolves to a non-empty profile, with a generic fallback
//! for unrecognized types.

use rand::Rng;
use serde::Serialize;

use crate::device::DeviceType;
use crate::telemetry::{TelemetryReading, TelemetryValue};
use crate::time::Timestamp;

/// How a signal's next value is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GeneratorKind {
    /// Uniformly distributed float in `[min, max]`.
    Uniform { min: f64, max: f64 },
    /// Fair coin flip.
    Boolean,
}

impl GeneratorKind {
    /// Draw the next value.
    #[must_use]
    pub fn sample(self) -> TelemetryValue {
        let mut rng = rand::thread_rng();
        match self {
            Self::Uniform { min, max } => TelemetryValue::Float(rng.gen_range(min..=max)),
            Self::Boolean => TelemetryValue::Bool(rng.gen_bool(0.5)),
        }
    }
}

/// One named signal a device type produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalSpec {
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub generator: GeneratorKind,
}

impl SignalSpec {
    /// Produce a reading for this signal at the given instant.
    #[must_use]
    pub fn read_at(&self, timestamp: Timestamp) -> TelemetryReading {
        TelemetryReading {
            timestamp,
            signal: self.name.to_string(),
            value: self.generator.sample(),
            unit: self.unit.map(str::to_string),
        }
    }
}

/// The fixed set of signals a device type produces.
///
/// Immutable once resolved; shared read-only by every simulator of the type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceProfile {
    pub signals: &'static [SignalSpec],
}

const PUMP_SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        name: "flow_rate",
        unit: Some("mL/min"),
        generator: GeneratorKind::Uniform { min: 0.1, max: 10.0 },
    },
    SignalSpec {
        name: "pressure",
        unit: Some("bar"),
        generator: GeneratorKind::Uniform { min: 0.5, max: 5.0 },
    },
];

const TEMPERATURE_CONTROLLER_SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        name: "temperature",
        unit: Some("°C"),
        generator: GeneratorKind::Uniform {
            min: 20.0,
            max: 80.0,
        },
    },
    SignalSpec {
        name: "humidity",
        unit: Some("%"),
        generator: GeneratorKind::Uniform {
            min: 30.0,
            max: 70.0,
        },
    },
];

const BALANCE_SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        name: "weight",
        unit: Some("g"),
        generator: GeneratorKind::Uniform {
            min: 0.001,
            max: 1000.0,
        },
    },
    SignalSpec {
        name: "stability",
        unit: None,
        generator: GeneratorKind::Boolean,
    },
];

const STIRRER_SIGNALS: &[SignalSpec] = &[
    SignalSpec {
        name: "speed",
        unit: Some("rpm"),
        generator: GeneratorKind::Uniform {
            min: 50.0,
            max: 1000.0,
        },
    },
    SignalSpec {
        name: "torque",
        unit: Some("N⋅m"),
        generator: GeneratorKind::Uniform { min: 0.1, max: 5.0 },
    },
];

const FALLBACK_SIGNALS: &[SignalSpec] = &[SignalSpec {
    name: "custom_value",
    unit: None,
    generator: GeneratorKind::Uniform { min: 0.0, max: 1.0 },
}];

impl DeviceProfile {
    /// Resolve the profile for a device type. Total: every type gets a
    /// non-empty profile, unrecognized types the generic fallback.
    #[must_use]
    pub fn resolve(device_type: &DeviceType) -> Self {
        let signals = match device_type {
            DeviceType::Pump => PUMP_SIGNALS,
            DeviceType::TemperatureController => TEMPERATURE_CONTROLLER_SIGNALS,
            DeviceType::Balance => BALANCE_SIGNALS,
            DeviceType::Stirrer => STIRRER_SIGNALS,
            DeviceType::Other(_) => FALLBACK_SIGNALS,
        };
        Self { signals }
    }
}

/// Parameters a device type requires in a start request, checked by the
/// command contract before device-specific start logic runs.
#[must_use]
pub fn required_start_params(device_type: &DeviceType) -> &'static [&'static str] {
    match device_type {
        DeviceType::TemperatureController => &["target_temperature"],
        DeviceType::Pump | DeviceType::Balance | DeviceType::Stirrer | DeviceType::Other(_) => &[],
    }
}
