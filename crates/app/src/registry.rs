//! Device registry — id → simulator map shared by the HTTP layer.
//!
//! The registry is the only structure mutated from many devices' call
//! paths at once, so it carries its own lock. Simulator handles are cheap
//! clones; task handles are always awaited outside the registry lock.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use labsim_domain::device::{DeviceConfig, DeviceType, SimulationConfig};
use labsim_domain::error::{LabSimError, NotFoundError};

use crate::simulator::{DeviceSimulator, StatusSnapshot};

struct RegistryInner {
    devices: HashMap<String, DeviceSimulator>,
    /// Per-type monotonic id sequence; never reused after delete.
    sequences: HashMap<DeviceType, u64>,
}

/// Registry of live device simulators.
pub struct DeviceRegistry {
    defaults: SimulationConfig,
    inner: RwLock<RegistryInner>,
}

impl DeviceRegistry {
    /// Create an empty registry. `defaults` is the simulation tuning used
    /// for devices whose config omits its own.
    #[must_use]
    pub fn new(defaults: SimulationConfig) -> Self {
        Self {
            defaults,
            inner: RwLock::new(RegistryInner {
                devices: HashMap::new(),
                sequences: HashMap::new(),
            }),
        }
    }

    /// Create a simulator from the config and register it under a freshly
    /// allocated `{device_type}_{sequence}` id.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::Validation`] if the config's simulation
    /// tuning is out of range.
    #[tracing::instrument(skip(self, config), fields(device_type = %config.device_type))]
    pub fn create(&self, config: DeviceConfig) -> Result<DeviceSimulator, LabSimError> {
        config.validate()?;

        let mut inner = self.write();
        let sequence = *inner
            .sequences
            .entry(config.device_type.clone())
            .and_modify(|n| *n += 1)
            .or_insert(1);
        let id = format!("{}_{sequence}", config.device_type);

        let simulator = DeviceSimulator::new(&id, config, &self.defaults);
        inner.devices.insert(id.clone(), simulator.clone());
        tracing::info!(device_id = %id, "device created");
        Ok(simulator)
    }

    /// Look up a simulator by id.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::NotFound`] when no device with `id` exists.
    pub fn get(&self, id: &str) -> Result<DeviceSimulator, LabSimError> {
        self.read().devices.get(id).cloned().ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Status snapshots of every registered device, keyed by id.
    #[must_use]
    pub fn snapshots(&self) -> HashMap<String, StatusSnapshot> {
        self.read()
            .devices
            .iter()
            .map(|(id, simulator)| (id.clone(), simulator.status_snapshot()))
            .collect()
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().devices.len()
    }

    /// Whether the registry holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().devices.is_empty()
    }

    /// Remove a device, cancelling its active operation first so no
    /// background work is orphaned.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::NotFound`] when no device with `id` exists.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), LabSimError> {
        let simulator = self.write().devices.remove(id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: id.to_string(),
        })?;
        simulator.shutdown().await;
        tracing::info!(device_id = %id, "device deleted");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
