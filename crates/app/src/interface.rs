//! Abstract device command contract layered atop the simulator.
//!
//! Mirrors the shared connect/disconnect/start/stop/status/reset skeleton
//! that real device drivers implement: required start parameters are
//! declared per device type (a lookup table, not subclassing) and checked
//! before the simulator sees the request. This sits outside the core
//! create/start/stop/delete command set the HTTP surface exposes.

use std::collections::HashMap;

use labsim_domain::error::{LabSimError, ValidationError};
use labsim_domain::id::OperationId;
use labsim_domain::operation::{OperationRecord, OperationRequest};
use labsim_domain::profile::required_start_params;

use crate::simulator::{DeviceSimulator, StatusSnapshot};

/// Uniform command interface over one simulated device.
pub struct CommandInterface {
    simulator: DeviceSimulator,
}

impl CommandInterface {
    /// Wrap a simulator in the command contract.
    #[must_use]
    pub fn new(simulator: DeviceSimulator) -> Self {
        Self { simulator }
    }

    /// Establish the (simulated) connection, bringing an offline device
    /// back to idle. Always succeeds.
    pub fn connect(&self) -> bool {
        self.simulator.set_online();
        true
    }

    /// Drop the (simulated) connection: any active operation is cancelled
    /// and the device goes offline. Always succeeds.
    pub async fn disconnect(&self) -> bool {
        self.simulator.shutdown().await;
        self.simulator.set_offline();
        true
    }

    /// Start an operation after checking the device type's required
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::Validation`] when a required parameter is
    /// missing, or whatever [`DeviceSimulator::start_operation`] returns.
    pub fn start(
        &self,
        parameters: HashMap<String, serde_json::Value>,
    ) -> Result<OperationRecord, LabSimError> {
        for required in required_start_params(&self.simulator.config().device_type) {
            if !parameters.contains_key(*required) {
                return Err(ValidationError::MissingParameter((*required).to_string()).into());
            }
        }
        self.simulator
            .start_operation(&OperationRequest::start(parameters))
    }

    /// Stop a running operation.
    ///
    /// # Errors
    ///
    /// Propagates [`DeviceSimulator::stop_operation`] errors.
    pub async fn stop(&self, operation_id: OperationId) -> Result<(), LabSimError> {
        self.simulator.stop_operation(operation_id).await
    }

    /// Current device status.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        self.simulator.status_snapshot()
    }

    /// Stop anything running and re-arm the device to idle.
    ///
    /// # Errors
    ///
    /// Propagates [`DeviceSimulator::reset`] errors (none once the active
    /// operation has been stopped).
    pub async fn reset(&self) -> Result<(), LabSimError> {
        self.simulator.shutdown().await;
        self.simulator.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labsim_domain::device::{DeviceConfig, DeviceMode, DeviceStatus, DeviceType, SimulationConfig};

    fn interface(device_type: DeviceType, mode: DeviceMode) -> CommandInterface {
        let id = format!("{device_type}_1");
        let config = DeviceConfig::builder(device_type)
            .mode(mode)
            .simulation_config(SimulationConfig {
                operation_delay: 1.0,
                error_probability: 1.0,
                data_update_interval: 0.5,
            })
            .build()
            .unwrap();
        CommandInterface::new(DeviceSimulator::new(id, config, &SimulationConfig::default()))
    }

    #[tokio::test]
    async fn should_reject_start_without_required_parameter() {
        let iface = interface(DeviceType::TemperatureController, DeviceMode::Normal);
        let result = iface.start(HashMap::new());
        assert!(matches!(
            result,
            Err(LabSimError::Validation(ValidationError::MissingParameter(name))) if name == "target_temperature"
        ));
        assert_eq!(iface.status().status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn should_start_when_required_parameter_present() {
        let iface = interface(DeviceType::TemperatureController, DeviceMode::Normal);
        let params = HashMap::from([(
            "target_temperature".to_string(),
            serde_json::json!(37.0),
        )]);
        let record = iface.start(params).unwrap();
        assert_eq!(record.status, "started");

        iface.stop(record.operation_id).await.unwrap();
        assert_eq!(iface.status().status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn should_start_pump_without_parameters() {
        let iface = interface(DeviceType::Pump, DeviceMode::Normal);
        let record = iface.start(HashMap::new()).unwrap();
        iface.stop(record.operation_id).await.unwrap();
    }

    #[tokio::test]
    async fn should_transition_offline_and_back_through_connect() {
        let iface = interface(DeviceType::Pump, DeviceMode::Normal);

        assert!(iface.disconnect().await);
        assert_eq!(iface.status().status, DeviceStatus::Offline);

        assert!(iface.connect());
        assert_eq!(iface.status().status, DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn should_block_start_while_offline() {
        let iface = interface(DeviceType::Pump, DeviceMode::Normal);
        iface.disconnect().await;

        let result = iface.start(HashMap::new());
        assert!(matches!(result, Err(LabSimError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reset_out_of_error_state() {
        let iface = interface(DeviceType::Pump, DeviceMode::Unstable);
        iface.start(HashMap::new()).unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(iface.status().status, DeviceStatus::Error);

        iface.reset().await.unwrap();
        assert_eq!(iface.status().status, DeviceStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_active_operation_during_reset() {
        let config = DeviceConfig::builder(DeviceType::Pump)
            .simulation_config(SimulationConfig {
                operation_delay: 100.0,
                error_probability: 0.0,
                data_update_interval: 10.0,
            })
            .build()
            .unwrap();
        let iface = CommandInterface::new(DeviceSimulator::new(
            "pump_1",
            config,
            &SimulationConfig::default(),
        ));
        iface.start(HashMap::new()).unwrap();
        assert_eq!(iface.status().status, DeviceStatus::Busy);

        iface.reset().await.unwrap();
        let snapshot = iface.status();
        assert_eq!(snapshot.status, DeviceStatus::Idle);
        assert!(snapshot.current_operation.is_none());
    }
}
