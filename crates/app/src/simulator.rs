//! Device simulator — the per-device state machine and its operation task.
//!
//! Each simulator owns its status, the single active operation task (if
//! any), the resolved signal profile, and two bounded histories. Command
//! handlers and the simulator's own task are the only writers, and at most
//! one task is active at a time, so a plain mutex around the mutable state
//! is enough: no await ever happens while the lock is held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use labsim_domain::buffer::RingBuffer;
use labsim_domain::device::{DeviceConfig, DeviceMode, DeviceStatus, SimulationConfig};
use labsim_domain::error::{DeviceBusyError, LabSimError, NotFoundError, ValidationError};
use labsim_domain::id::OperationId;
use labsim_domain::operation::{OperationRecord, OperationRequest};
use labsim_domain::profile::DeviceProfile;
use labsim_domain::telemetry::{ErrorRecord, TelemetryReading};
use labsim_domain::time::{self, Timestamp};

/// Maximum telemetry readings retained per device.
pub const TELEMETRY_CAPACITY: usize = 1000;
/// Maximum error records retained per device.
pub const ERROR_CAPACITY: usize = 100;

/// Point-in-time view of a simulator, returned by the status command.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusSnapshot {
    pub device_id: String,
    pub status: DeviceStatus,
    pub current_operation: Option<OperationId>,
    pub last_update: Timestamp,
    pub config: DeviceConfig,
}

/// How an operation task ended.
enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// The single active operation task, owned by the simulator.
struct ActiveTask {
    operation_id: OperationId,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Mutable simulator state behind the lock.
struct SimulatorState {
    status: DeviceStatus,
    current_operation: Option<OperationId>,
    telemetry: RingBuffer<TelemetryReading>,
    errors: RingBuffer<ErrorRecord>,
    last_update: Timestamp,
    active: Option<ActiveTask>,
}

/// Everything the operation task shares with the command handlers.
struct Shared {
    id: String,
    config: DeviceConfig,
    sim: SimulationConfig,
    profile: DeviceProfile,
    inner: Mutex<SimulatorState>,
}

/// A simulated laboratory instrument.
///
/// Cheap to clone: a handle over shared state, so the registry, HTTP
/// handlers, and the device's own operation task can all hold one.
#[derive(Clone)]
pub struct DeviceSimulator {
    shared: Arc<Shared>,
}

impl DeviceSimulator {
    /// Build a simulator from its config, falling back to `defaults` when
    /// the config carries no simulation tuning of its own.
    #[must_use]
    pub fn new(id: impl Into<String>, config: DeviceConfig, defaults: &SimulationConfig) -> Self {
        let sim = config
            .simulation_config
            .clone()
            .unwrap_or_else(|| defaults.clone());
        let profile = DeviceProfile::resolve(&config.device_type);
        Self {
            shared: Arc::new(Shared {
                id: id.into(),
                config,
                sim,
                profile,
                inner: Mutex::new(SimulatorState {
                    status: DeviceStatus::Idle,
                    current_operation: None,
                    telemetry: RingBuffer::new(TELEMETRY_CAPACITY),
                    errors: RingBuffer::new(ERROR_CAPACITY),
                    last_update: time::now(),
                    active: None,
                }),
            }),
        }
    }

    /// The device identifier (`{device_type}_{sequence}`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// The immutable creation config.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    /// The effective simulation tuning.
    #[must_use]
    pub fn simulation_config(&self) -> &SimulationConfig {
        &self.shared.sim
    }

    /// The resolved signal profile.
    #[must_use]
    pub fn profile(&self) -> DeviceProfile {
        self.shared.profile
    }

    /// Current status snapshot. Pure read, never fails.
    #[must_use]
    pub fn status_snapshot(&self) -> StatusSnapshot {
        let state = self.shared.state();
        StatusSnapshot {
            device_id: self.shared.id.clone(),
            status: state.status,
            current_operation: state.current_operation,
            last_update: state.last_update,
            config: self.shared.config.clone(),
        }
    }

    /// Current status value.
    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.shared.state().status
    }

    /// Copy of the telemetry history, oldest-first.
    #[must_use]
    pub fn telemetry(&self) -> Vec<TelemetryReading> {
        self.shared.state().telemetry.iter().cloned().collect()
    }

    /// Copy of the error history, oldest-first.
    #[must_use]
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.shared.state().errors.iter().cloned().collect()
    }

    /// Start a new operation on the device.
    ///
    /// Computes the duration from the device mode, spawns the operation
    /// task, and returns immediately with the record. The at-most-one-task
    /// invariant is enforced here under the state lock.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::DeviceBusy`] if an operation is already
    /// active, or [`LabSimError::Validation`] if the device is in a state
    /// (error, maintenance, offline) that must be reset first.
    #[tracing::instrument(skip(self, request), fields(device_id = %self.shared.id))]
    pub fn start_operation(
        &self,
        request: &OperationRequest,
    ) -> Result<OperationRecord, LabSimError> {
        let duration = self.shared.planned_duration();
        let fail_after = self.shared.plan_failure(duration);

        let mut state = self.shared.state();
        if let Some(operation_id) = state.current_operation {
            return Err(DeviceBusyError {
                device_id: self.shared.id.clone(),
                operation_id,
            }
            .into());
        }
        if state.status != DeviceStatus::Idle {
            return Err(ValidationError::WrongState {
                status: state.status.as_str(),
                hint: "reset is required before starting a new operation",
            }
            .into());
        }

        let operation_id = OperationId::new();
        let start_time = time::now();
        let estimated_completion = start_time + chrono_secs(duration);

        state.status = DeviceStatus::Busy;
        state.current_operation = Some(operation_id);
        state.last_update = start_time;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(Shared::run(
            Arc::clone(&self.shared),
            operation_id,
            duration,
            fail_after,
            cancel_rx,
        ));
        state.active = Some(ActiveTask {
            operation_id,
            cancel: cancel_tx,
            handle,
        });

        tracing::info!(%operation_id, duration_secs = duration, "operation started");
        Ok(OperationRecord {
            operation_id,
            status: "started".to_string(),
            start_time,
            estimated_completion,
            parameters: request.parameters.clone(),
        })
    }

    /// Stop the active operation.
    ///
    /// Idempotent when nothing is running. Blocks until the task has
    /// observably stopped and the status reflects idle.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::NotFound`] when an operation is active but
    /// `operation_id` does not name it.
    #[tracing::instrument(skip(self), fields(device_id = %self.shared.id))]
    pub async fn stop_operation(&self, operation_id: OperationId) -> Result<(), LabSimError> {
        let task = {
            let mut state = self.shared.state();
            match state.active.take() {
                None => return Ok(()),
                Some(task) if task.operation_id != operation_id => {
                    state.active = Some(task);
                    return Err(NotFoundError {
                        entity: "Operation",
                        id: operation_id.to_string(),
                    }
                    .into());
                }
                Some(task) => task,
            }
        };
        self.cancel_and_join(task).await;
        Ok(())
    }

    /// Cancel whatever operation is active and wait for it to stop.
    ///
    /// Used by delete and disconnect paths, where the caller does not care
    /// which operation is running.
    pub async fn shutdown(&self) {
        let task = self.shared.state().active.take();
        if let Some(task) = task {
            self.cancel_and_join(task).await;
        }
    }

    /// Re-arm a device out of the error (or maintenance) state.
    ///
    /// # Errors
    ///
    /// Returns [`LabSimError::Validation`] while an operation is active;
    /// stop it first.
    pub fn reset(&self) -> Result<(), LabSimError> {
        let mut state = self.shared.state();
        if state.status == DeviceStatus::Busy {
            return Err(ValidationError::WrongState {
                status: state.status.as_str(),
                hint: "stop the active operation before resetting",
            }
            .into());
        }
        state.status = DeviceStatus::Idle;
        state.last_update = time::now();
        tracing::info!(device_id = %self.shared.id, "device reset");
        Ok(())
    }

    /// Bring a disconnected device back online.
    pub(crate) fn set_online(&self) {
        let mut state = self.shared.state();
        if state.status == DeviceStatus::Offline {
            state.status = DeviceStatus::Idle;
            state.last_update = time::now();
        }
    }

    /// Mark the device offline. The caller must have stopped any active
    /// operation first.
    pub(crate) fn set_offline(&self) {
        let mut state = self.shared.state();
        state.status = DeviceStatus::Offline;
        state.last_update = time::now();
    }

    async fn cancel_and_join(&self, task: ActiveTask) {
        // The send only fails if the task already dropped its receiver,
        // meaning it is finishing on its own.
        let _ = task.cancel.send(true);
        if let Err(err) = task.handle.await {
            tracing::warn!(device_id = %self.shared.id, error = %err, "operation task join failed");
        }
    }

    #[cfg(test)]
    fn emit_telemetry(&self) {
        self.shared.emit_telemetry();
    }
}

impl Shared {
    /// Operation task body: emit telemetry on a fixed cadence until the
    /// planned duration elapses, honoring cancellation at every sleep.
    async fn run(
        this: Arc<Self>,
        operation_id: OperationId,
        duration: f64,
        fail_after: Option<f64>,
        mut cancel: watch::Receiver<bool>,
    ) {
        let outcome = this.execute(duration, fail_after, &mut cancel).await;
        this.finish(operation_id, &outcome);
    }

    async fn execute(
        &self,
        duration: f64,
        fail_after: Option<f64>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Outcome {
        if let Some(delay) = fail_after {
            if sleep_or_cancelled(delay, cancel).await {
                return Outcome::Cancelled;
            }
            return Outcome::Failed("Simulated operation failure".to_string());
        }

        let interval = self.sim.data_update_interval;
        let mut elapsed = 0.0;
        while elapsed < duration {
            self.emit_telemetry();
            if sleep_or_cancelled(interval, cancel).await {
                return Outcome::Cancelled;
            }
            elapsed += interval;
        }

        // Land exactly on the estimated completion time.
        let remainder = (duration - elapsed).max(0.0);
        if remainder > 0.0 && sleep_or_cancelled(remainder, cancel).await {
            return Outcome::Cancelled;
        }
        Outcome::Completed
    }

    /// Resolve the device back to its terminal state for this operation.
    fn finish(&self, operation_id: OperationId, outcome: &Outcome) {
        let mut state = self.state();
        if state
            .active
            .as_ref()
            .is_some_and(|task| task.operation_id == operation_id)
        {
            // Normal completion or failure: the task detaches itself.
            state.active = None;
        }
        match outcome {
            Outcome::Completed => {
                state.status = DeviceStatus::Idle;
                tracing::info!(device_id = %self.id, %operation_id, "operation completed");
            }
            Outcome::Cancelled => {
                state.status = DeviceStatus::Idle;
                state.errors.push(ErrorRecord::cancelled());
                tracing::info!(device_id = %self.id, %operation_id, "operation cancelled");
            }
            Outcome::Failed(message) => {
                state.status = DeviceStatus::Error;
                state.errors.push(ErrorRecord::failed(message.clone()));
                tracing::error!(device_id = %self.id, %operation_id, message, "operation failed");
            }
        }
        state.current_operation = None;
        state.last_update = time::now();
    }

    /// Emit one reading per profile signal, evicting the oldest entries
    /// once the buffer is full.
    fn emit_telemetry(&self) {
        let timestamp = time::now();
        let readings: Vec<TelemetryReading> = self
            .profile
            .signals
            .iter()
            .map(|signal| signal.read_at(timestamp))
            .collect();
        let mut state = self.state();
        for reading in readings {
            state.telemetry.push(reading);
        }
        state.last_update = timestamp;
    }

    /// Duration for the next operation, derived from the device mode.
    fn planned_duration(&self) -> f64 {
        let base = self.sim.operation_delay;
        match self.config.mode {
            DeviceMode::Fast => base * 0.5,
            DeviceMode::Unstable => base * rand::thread_rng().gen_range(0.5..=2.0),
            DeviceMode::Normal | DeviceMode::Custom => base,
        }
    }

    /// Draw once whether (and when) this operation will fail. Only
    /// unstable devices inject failures.
    fn plan_failure(&self, duration: f64) -> Option<f64> {
        if self.config.mode != DeviceMode::Unstable {
            return None;
        }
        let mut rng = rand::thread_rng();
        if rng.gen_range(0.0..1.0) < self.sim.error_probability {
            Some(duration * rng.gen_range(0.1..=0.5))
        } else {
            None
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DeviceSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSimulator")
            .field("id", &self.shared.id)
            .field("device_type", &self.shared.config.device_type)
            .field("mode", &self.shared.config.mode)
            .finish_non_exhaustive()
    }
}

/// Sleep for `seconds`, returning `true` if cancellation arrived first.
async fn sleep_or_cancelled(seconds: f64, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        () = tokio::time::sleep(Duration::from_secs_f64(seconds)) => false,
        _ = cancel.changed() => true,
    }
}

fn chrono_secs(seconds: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((seconds * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labsim_domain::device::DeviceType;
    use labsim_domain::telemetry::ErrorCode;
    use std::collections::HashMap;

    fn simulator(mode: DeviceMode, sim: SimulationConfig) -> DeviceSimulator {
        let config = DeviceConfig::builder(DeviceType::Pump)
            .mode(mode)
            .simulation_config(sim)
            .build()
            .unwrap();
        DeviceSimulator::new("pump_1", config, &SimulationConfig::default())
    }

    fn fast_ticks() -> SimulationConfig {
        SimulationConfig {
            operation_delay: 1.0,
            error_probability: 0.0,
            data_update_interval: 0.5,
        }
    }

    fn start_request() -> OperationRequest {
        OperationRequest::start(HashMap::from([(
            "flow_rate".to_string(),
            serde_json::json!(5.0),
        )]))
    }

    /// The busy flag and the operation id must always agree.
    fn assert_invariant(sim: &DeviceSimulator) {
        let snapshot = sim.status_snapshot();
        assert_eq!(
            snapshot.current_operation.is_some(),
            snapshot.status == DeviceStatus::Busy
        );
    }

    #[tokio::test]
    async fn should_initialize_idle_with_empty_histories() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let snapshot = sim.status_snapshot();
        assert_eq!(snapshot.device_id, "pump_1");
        assert_eq!(snapshot.status, DeviceStatus::Idle);
        assert!(snapshot.current_operation.is_none());
        assert!(sim.telemetry().is_empty());
        assert!(sim.errors().is_empty());
    }

    #[tokio::test]
    async fn should_return_started_record_with_estimated_completion() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let record = sim.start_operation(&start_request()).unwrap();

        assert_eq!(record.status, "started");
        assert_eq!(record.parameters["flow_rate"], serde_json::json!(5.0));
        let planned = record.estimated_completion - record.start_time;
        assert_eq!(planned.num_milliseconds(), 1000);

        assert_eq!(sim.status(), DeviceStatus::Busy);
        assert_invariant(&sim);
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn should_reject_second_start_while_busy() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let first = sim.start_operation(&start_request()).unwrap();

        let result = sim.start_operation(&start_request());
        assert!(matches!(result, Err(LabSimError::DeviceBusy(_))));

        // The rejection must not have disturbed the running operation.
        let snapshot = sim.status_snapshot();
        assert_eq!(snapshot.current_operation, Some(first.operation_id));
        assert_invariant(&sim);
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_emit_telemetry_and_return_to_idle_on_completion() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        sim.start_operation(&start_request()).unwrap();

        tokio::time::sleep(Duration::from_secs_f64(1.5)).await;

        assert_eq!(sim.status(), DeviceStatus::Idle);
        assert_invariant(&sim);
        assert!(sim.errors().is_empty());

        // Two loop iterations, two pump signals each.
        let telemetry = sim.telemetry();
        assert_eq!(telemetry.len(), 4);
        assert_eq!(telemetry[0].signal, "flow_rate");
        assert_eq!(telemetry[1].signal, "pressure");
    }

    #[tokio::test(start_paused = true)]
    async fn should_finish_fast_mode_strictly_before_normal_mode() {
        let fast = simulator(DeviceMode::Fast, fast_ticks());
        let normal = simulator(DeviceMode::Normal, fast_ticks());

        let fast_record = fast.start_operation(&start_request()).unwrap();
        let normal_record = normal.start_operation(&start_request()).unwrap();

        let fast_planned = fast_record.estimated_completion - fast_record.start_time;
        let normal_planned = normal_record.estimated_completion - normal_record.start_time;
        assert_eq!(fast_planned.num_milliseconds(), 500);
        assert_eq!(normal_planned.num_milliseconds(), 1000);
        assert!(fast_planned < normal_planned);

        // After the fast duration only the fast device is idle again.
        tokio::time::sleep(Duration::from_secs_f64(0.75)).await;
        assert_eq!(fast.status(), DeviceStatus::Idle);
        assert_eq!(normal.status(), DeviceStatus::Busy);

        tokio::time::sleep(Duration::from_secs_f64(0.75)).await;
        assert_eq!(normal.status(), DeviceStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_with_error_status_when_unstable_and_probability_one() {
        let sim = simulator(
            DeviceMode::Unstable,
            SimulationConfig {
                operation_delay: 1.0,
                error_probability: 1.0,
                data_update_interval: 0.5,
            },
        );
        sim.start_operation(&start_request()).unwrap();

        // Worst case: duration 2.0s, failure after half of it.
        tokio::time::sleep(Duration::from_secs_f64(2.0)).await;

        assert_eq!(sim.status(), DeviceStatus::Error);
        assert_invariant(&sim);
        let errors = sim.errors();
        assert!(!errors.is_empty());
        assert_eq!(errors[0].code, ErrorCode::OperationFailed);
        assert_eq!(errors[0].message, "Simulated operation failure");
    }

    #[tokio::test(start_paused = true)]
    async fn should_block_restart_after_failure_until_reset() {
        let sim = simulator(
            DeviceMode::Unstable,
            SimulationConfig {
                operation_delay: 1.0,
                error_probability: 1.0,
                data_update_interval: 0.5,
            },
        );
        sim.start_operation(&start_request()).unwrap();
        tokio::time::sleep(Duration::from_secs_f64(2.0)).await;
        assert_eq!(sim.status(), DeviceStatus::Error);

        let result = sim.start_operation(&start_request());
        assert!(matches!(
            result,
            Err(LabSimError::Validation(ValidationError::WrongState { .. }))
        ));

        sim.reset().unwrap();
        assert_eq!(sim.status(), DeviceStatus::Idle);
        assert!(sim.start_operation(&start_request()).is_ok());
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_cancel_promptly_and_record_cancellation_on_stop() {
        let sim = simulator(
            DeviceMode::Normal,
            SimulationConfig {
                operation_delay: 100.0,
                error_probability: 0.0,
                data_update_interval: 10.0,
            },
        );
        let record = sim.start_operation(&start_request()).unwrap();

        sim.stop_operation(record.operation_id).await.unwrap();

        let snapshot = sim.status_snapshot();
        assert_eq!(snapshot.status, DeviceStatus::Idle);
        assert!(snapshot.current_operation.is_none());
        let errors = sim.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::OperationCancelled);
    }

    #[tokio::test]
    async fn should_treat_stop_without_active_operation_as_no_op() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let result = sim.stop_operation(OperationId::new()).await;
        assert!(result.is_ok());
        assert_eq!(sim.status(), DeviceStatus::Idle);
    }

    #[tokio::test]
    async fn should_reject_stop_with_mismatched_operation_id() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let record = sim.start_operation(&start_request()).unwrap();

        let result = sim.stop_operation(OperationId::new()).await;
        assert!(matches!(result, Err(LabSimError::NotFound(_))));

        // The running operation must be untouched.
        let snapshot = sim.status_snapshot();
        assert_eq!(snapshot.status, DeviceStatus::Busy);
        assert_eq!(snapshot.current_operation, Some(record.operation_id));
        sim.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn should_shutdown_device_with_active_operation() {
        let sim = simulator(
            DeviceMode::Normal,
            SimulationConfig {
                operation_delay: 100.0,
                error_probability: 0.0,
                data_update_interval: 10.0,
            },
        );
        sim.start_operation(&start_request()).unwrap();

        sim.shutdown().await;

        assert_eq!(sim.status(), DeviceStatus::Idle);
        assert_invariant(&sim);
    }

    #[tokio::test]
    async fn should_reject_reset_while_busy() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        sim.start_operation(&start_request()).unwrap();

        let result = sim.reset();
        assert!(matches!(result, Err(LabSimError::Validation(_))));
        sim.shutdown().await;
    }

    #[tokio::test]
    async fn should_cap_telemetry_history_at_capacity() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        // Pump emits two readings per tick; 550 ticks produce 1100 readings.
        for _ in 0..550 {
            sim.emit_telemetry();
        }
        let telemetry = sim.telemetry();
        assert_eq!(telemetry.len(), TELEMETRY_CAPACITY);
    }

    #[tokio::test(start_paused = true)]
    async fn should_serve_fallback_profile_for_unrecognized_type() {
        let config = DeviceConfig::builder(DeviceType::Other("laser".to_string()))
            .simulation_config(fast_ticks())
            .build()
            .unwrap();
        let sim = DeviceSimulator::new("laser_1", config, &SimulationConfig::default());

        let profile = sim.profile();
        assert_eq!(profile.signals.len(), 1);
        assert_eq!(profile.signals[0].name, "custom_value");

        sim.start_operation(&start_request()).unwrap();
        tokio::time::sleep(Duration::from_secs_f64(1.5)).await;

        assert_eq!(sim.status(), DeviceStatus::Idle);
        let telemetry = sim.telemetry();
        assert!(!telemetry.is_empty());
        assert!(telemetry.iter().all(|reading| reading.signal == "custom_value"));
    }

    #[tokio::test]
    async fn should_return_identical_snapshots_between_commands() {
        let sim = simulator(DeviceMode::Normal, fast_ticks());
        let first = sim.status_snapshot();
        let second = sim.status_snapshot();
        assert_eq!(first.status, second.status);
        assert_eq!(first.current_operation, second.current_operation);
        assert_eq!(first.device_id, second.device_id);
        assert_eq!(first.last_update, second.last_update);
    }
}
