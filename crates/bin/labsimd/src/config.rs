//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `labsim.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use labsim_domain::device::SimulationConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulation defaults applied to devices created without tuning.
    pub simulation: SimulationDefaults,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Verbose request logging.
    pub debug: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Default simulation tuning for devices created without their own.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationDefaults {
    /// Base delay for operations in seconds.
    pub default_operation_delay: f64,
    /// Probability of operation failure (0–1).
    pub default_error_probability: f64,
    /// Interval for telemetry updates in seconds.
    pub default_data_update_interval: f64,
}

impl Config {
    /// Load configuration from `labsim.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value is out of range after overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("labsim.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LABSIM_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("LABSIM_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("LABSIM_DEBUG") {
            self.server.debug = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Ok(val) = std::env::var("LABSIM_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("LABSIM_DEFAULT_OPERATION_DELAY") {
            if let Ok(delay) = val.parse() {
                self.simulation.default_operation_delay = delay;
            }
        }
        if let Ok(val) = std::env::var("LABSIM_DEFAULT_ERROR_PROBABILITY") {
            if let Ok(probability) = val.parse() {
                self.simulation.default_error_probability = probability;
            }
        }
        if let Ok(val) = std::env::var("LABSIM_DEFAULT_DATA_UPDATE_INTERVAL") {
            if let Ok(interval) = val.parse() {
                self.simulation.default_data_update_interval = interval;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        self.simulation_defaults()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Simulation tuning handed to the registry as the per-device default.
    #[must_use]
    pub fn simulation_defaults(&self) -> SimulationConfig {
        SimulationConfig {
            operation_delay: self.simulation.default_operation_delay,
            error_probability: self.simulation.default_error_probability,
            data_update_interval: self.simulation.default_data_update_interval,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "labsimd=info,labsim=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for SimulationDefaults {
    fn default() -> Self {
        Self {
            default_operation_delay: 2.0,
            default_error_probability: 0.1,
            default_data_update_interval: 1.0,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
