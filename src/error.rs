//! # Error Types
//!
//! Custom error types for RVR Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for RVR Bridge
#[derive(Debug, Error)]
pub enum RvrBridgeError {
    /// Sphero API packet errors
    #[error("Sphero protocol error: {0}")]
    Protocol(String),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No usable serial device
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// The transport reported a failure while opening the channel to the robot
    #[error("Failed to open channel to RVR: {0}")]
    ChannelOpen(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry record serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for RVR Bridge
pub type Result<T> = std::result::Result<T, RvrBridgeError>;
