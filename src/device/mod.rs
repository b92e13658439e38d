//! # Device Module
//!
//! The vocabulary shared by the pin mapping core and the transport:
//!
//! - [`DeviceCommand`]: actuator and housekeeping commands sent to the robot
//! - [`DeviceEvent`]: channel state changes and decoded telemetry
//! - [`CommandSink`]: the fire-and-forget seam the controller writes through

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::sphero::protocol::{Led, RawMotorMode};

/// Sensor streams the controller can enable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStream {
    Accelerometer,
    ColorDetection,
}

/// Commands understood by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Wake,
    GetBatteryPercentage,
    SetSingleLed {
        led: Led,
        red: u8,
        green: u8,
        blue: u8,
    },
    SetAllLeds {
        red: u8,
        green: u8,
        blue: u8,
    },
    SetRawMotors {
        left_mode: RawMotorMode,
        left_speed: u8,
        right_mode: RawMotorMode,
        right_speed: u8,
    },
    EnableSensorStream {
        stream: SensorStream,
        interval_ms: u16,
    },
}

/// Accelerometer reading in g
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerometerSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Color sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Detected color index, [`ColorSample::NO_DETECTION`] when nothing was seen
    pub index: u8,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
}

impl ColorSample {
    /// Index reported when the sensor sees nothing
    pub const NO_DETECTION: u8 = 255;

    pub fn is_detection(&self) -> bool {
        self.index != Self::NO_DETECTION
    }
}

/// Events delivered from the device layer to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The transport opened its channel to the robot
    ChannelOpened,
    /// The transport could not open its channel
    ChannelError(String),
    BatteryPercentage(u8),
    Accelerometer(AccelerometerSample),
    ColorDetection(ColorSample),
}

/// Destination for device commands
///
/// Sending never blocks and never reports delivery; retries and timeouts
/// belong to the transport.
#[cfg_attr(test, mockall::automock)]
pub trait CommandSink {
    fn send(&mut self, command: DeviceCommand);
}

impl CommandSink for UnboundedSender<DeviceCommand> {
    fn send(&mut self, command: DeviceCommand) {
        if UnboundedSender::send(self, command).is_err() {
            warn!("Command writer has stopped, dropping {:?}", command);
        }
    }
}
