//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field has a default, so an empty file is a valid
//! configuration apart from the serial port, which must be supplied either in
//! the file or on the command line.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{Result, RvrBridgeError};

/// Baud rates accepted by the RVR's UART
const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400];

/// Log levels understood by the tracing filter
const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Pin mapping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Red channel intensity used when a light pin is switched on
    #[serde(default = "default_light_intensity")]
    pub light_intensity: u8,

    /// Sensor streaming period requested from the robot
    #[serde(default = "default_sensor_interval_ms")]
    pub sensor_interval_ms: u16,

    #[serde(default = "default_stream_enabled")]
    pub accelerometer: bool,

    #[serde(default = "default_stream_enabled")]
    pub color_detection: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; console only when empty
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_baud_rate() -> u32 { 115200 }

fn default_light_intensity() -> u8 { 255 }
fn default_sensor_interval_ms() -> u16 { 100 }
fn default_stream_enabled() -> bool { true }

fn default_log_dir() -> String { "./telemetry".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            light_intensity: default_light_intensity(),
            sensor_interval_ms: default_sensor_interval_ms(),
            accelerometer: default_stream_enabled(),
            color_detection: default_stream_enabled(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RvrBridgeError {
    RvrBridgeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// The serial port may legitimately be missing from the file (it can be
    /// given on the command line), so this only parses. Call
    /// [`Config::validate`] once all overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or TOML parsing fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rvr_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// config.validate()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port must be provided (--serial-port or [serial] port)"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.controller.light_intensity == 0 {
            return Err(invalid("light_intensity must be greater than 0"));
        }

        if self.controller.sensor_interval_ms < 10 || self.controller.sensor_interval_ms > 10000 {
            return Err(invalid("sensor_interval_ms must be between 10 and 10000"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if !SUPPORTED_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of: {}",
                SUPPORTED_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
