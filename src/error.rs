//! ==============================================================================
//! error.rs - fault taxonomy
//! ==============================================================================
//!
//! purpose:
//!     typed faults for the parts of the pipeline the sampling loop has to
//!     tell apart. startup code wraps these in anyhow with context.
//!
//! relationships:
//!     - used by: sensor.rs, hal.rs (TransportFault)
//!     - used by: telemetry.rs (TelemetryError)
//!     - used by: connectivity.rs (ConnectivityFault)
//!     - used by: config.rs (ConfigError)
//!     - used by: monitor.rs (CycleError)
//!
//! ==============================================================================

use thiserror::Error;

/// serial port faults
#[derive(Debug, Error)]
pub enum TransportFault {
    /// port could not be opened or configured; fatal at startup
    #[cfg_attr(not(feature = "hardware"), allow(dead_code))]
    #[error("failed to open serial port {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("serial i/o error: {0}")]
    Io(String),

    /// the sensor answered with fewer bytes than a full frame
    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },
}

/// network not reachable (retried, never surfaced to the user)
#[derive(Debug, Error)]
pub enum ConnectivityFault {
    #[error("probe timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("probe failed: {0}")]
    Unreachable(String),
}

/// telemetry sink delivery faults
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned status {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("polling.interval_seconds must be greater than 1 (got {0})")]
    IntervalTooShort(u64),

    #[error("connectivity.attempt_timeout_seconds must be greater than 0")]
    ZeroAttemptTimeout,
}

/// a single sampling cycle failed and was skipped
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Transport(#[from] TransportFault),
}
