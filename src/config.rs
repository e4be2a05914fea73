//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `monitor.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - PollingConfig: How often a sample is taken (must be > 1s).
//!     - SensorConfig: Serial device and the RESET/SET GPIO pins.
//!     - AlertConfig: Hysteresis margin around the AQI 50 threshold.
//!     - TelemetryConfig: Blynk server and auth token.
//!     - ConnectivityConfig: Probe URL and retry/backoff policy.
//!     - LoggingConfig: Log level and per-sample output.
//!
//! ==============================================================================

use crate::connectivity::RetryPolicy;
use crate::error::ConfigError;

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    pub interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 5 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConfig {
    pub serial_port: String,
    /// BCM pin wired to the sensor RESET input
    pub reset_pin: u8,
    /// BCM pin wired to the sensor SET input
    pub set_pin: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/serial0".to_string(),
            reset_pin: 23,
            set_pin: 24,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    pub hysteresis: u16,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { hysteresis: 10 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub server: String,
    /// empty token = log-only sink
    pub auth_token: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            server: "http://blynk-cloud.com".to_string(),
            auth_token: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe_url: String,
    pub attempt_timeout_seconds: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_url: "http://google.com/".to_string(),
            attempt_timeout_seconds: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl ConnectivityConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(self.attempt_timeout_seconds),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Parse and validate a TOML document
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: MonitorConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;
        config.validate()?;

        Ok(config)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("monitor.toml"),
            std::path::PathBuf::from("..").join("config").join("monitor.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_seconds <= 1 {
            return Err(ConfigError::IntervalTooShort(self.polling.interval_seconds));
        }
        if self.connectivity.attempt_timeout_seconds == 0 {
            return Err(ConfigError::ZeroAttemptTimeout);
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let telemetry = if self.telemetry.auth_token.is_empty() { "log only" } else { "blynk" };
        println!("┌─────────────────────────────────────────┐");
        println!("│          MONITOR CONFIGURATION          │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Serial Port: {}", self.sensor.serial_port);
        println!("│ RESET/SET Pins: {}/{}", self.sensor.reset_pin, self.sensor.set_pin);
        println!("│ Poll Interval: {}s", self.polling.interval_seconds);
        println!("│ Hysteresis: {}", self.alert.hysteresis);
        println!("│ Telemetry: {}", telemetry);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
