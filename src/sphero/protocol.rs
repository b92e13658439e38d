//! # Sphero API Constants and Types
//!
//! Core protocol definitions for Sphero API v2 packets as spoken by the RVR.

use crate::error::{Result, RvrBridgeError};

/// Start of packet
pub const SOP: u8 = 0x8D;

/// End of packet
pub const EOP: u8 = 0xD8;

/// Escape byte
pub const ESC: u8 = 0xAB;

/// Bits cleared from an escaped byte on the wire and restored on decode
pub const ESCAPE_MASK: u8 = 0x88;

/// Escaped forms of SOP, EOP and ESC
pub const ESCAPED_SOP: u8 = SOP & !ESCAPE_MASK;
pub const ESCAPED_EOP: u8 = EOP & !ESCAPE_MASK;
pub const ESCAPED_ESC: u8 = ESC & !ESCAPE_MASK;

/// Maximum unescaped payload carried by a single packet
pub const MAX_PAYLOAD_SIZE: usize = 128;

/// Packet flag bits
pub mod flags {
    pub const IS_RESPONSE: u8 = 0x01;
    pub const REQUESTS_RESPONSE: u8 = 0x02;
    pub const REQUESTS_ERROR_RESPONSE: u8 = 0x04;
    pub const IS_ACTIVITY: u8 = 0x08;
    pub const HAS_TARGET: u8 = 0x10;
    pub const HAS_SOURCE: u8 = 0x20;
}

/// Node addresses
pub mod address {
    /// Host on the UART
    pub const HOST: u8 = 0x01;
    /// Nordic processor (power, color sensor)
    pub const NORDIC: u8 = 0x11;
    /// ST processor (drive, IMU, LEDs)
    pub const ST: u8 = 0x12;
}

/// Device identifiers
pub mod device_id {
    pub const POWER: u8 = 0x13;
    pub const DRIVE: u8 = 0x16;
    pub const SENSOR: u8 = 0x18;
    pub const IO: u8 = 0x1A;
}

/// Command identifiers, grouped by device
pub mod command_id {
    // Power
    pub const WAKE: u8 = 0x0D;
    pub const GET_BATTERY_PERCENTAGE: u8 = 0x10;

    // Drive
    pub const SET_RAW_MOTORS: u8 = 0x01;

    // Sensor
    pub const ENABLE_COLOR_DETECTION: u8 = 0x38;
    pub const CONFIGURE_STREAMING_SERVICE: u8 = 0x39;
    pub const START_STREAMING_SERVICE: u8 = 0x3A;
    pub const STREAMING_SERVICE_DATA: u8 = 0x3D;

    // IO
    pub const SET_ALL_LEDS: u8 = 0x1A;
}

/// Streaming service definitions
pub mod streaming {
    /// Accelerometer service on the ST processor
    pub const ACCELEROMETER_SERVICE: u16 = 0x0202;
    pub const ACCELEROMETER_TOKEN: u8 = 0x01;

    /// Color detection service on the Nordic processor
    pub const COLOR_DETECTION_SERVICE: u16 = 0x0003;
    pub const COLOR_DETECTION_TOKEN: u8 = 0x02;

    /// Slot sizes for configure-streaming
    pub const DATA_SIZE_8_BIT: u8 = 0x00;
    pub const DATA_SIZE_32_BIT: u8 = 0x02;

    /// Accelerometer range in g
    pub const ACCELEROMETER_MIN: f64 = -16.0;
    pub const ACCELEROMETER_MAX: f64 = 16.0;
}

/// Raw motor drive modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RawMotorMode {
    Off = 0,
    Forward = 1,
    Reverse = 2,
}

/// RVR light groups
///
/// Each group owns three consecutive bits (red, green, blue) of the 32-bit LED
/// mask, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Led {
    RightHeadlight = 0,
    LeftHeadlight = 1,
    LeftStatus = 2,
    RightStatus = 3,
    BatteryDoorRear = 4,
    BatteryDoorFront = 5,
    PowerButtonFront = 6,
    PowerButtonRear = 7,
    LeftBrakelight = 8,
    RightBrakelight = 9,
}

impl Led {
    /// Every light group, in mask order
    pub const ALL: [Led; 10] = [
        Led::RightHeadlight,
        Led::LeftHeadlight,
        Led::LeftStatus,
        Led::RightStatus,
        Led::BatteryDoorRear,
        Led::BatteryDoorFront,
        Led::PowerButtonFront,
        Led::PowerButtonRear,
        Led::LeftBrakelight,
        Led::RightBrakelight,
    ];

    /// Mask bits covering this group's red, green and blue channels
    ///
    /// # Examples
    ///
    /// ```
    /// use rvr_bridge::sphero::protocol::Led;
    ///
    /// assert_eq!(Led::RightHeadlight.mask(), 0x0000_0007);
    /// assert_eq!(Led::LeftHeadlight.mask(), 0x0000_0038);
    /// ```
    pub fn mask(self) -> u32 {
        0b111 << (self as u32 * 3)
    }
}

/// A single Sphero API packet, unescaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Flag bits other than the addressing bits, which follow `target`/`source`
    pub flags: u8,

    pub target: Option<u8>,

    pub source: Option<u8>,

    pub device_id: u8,

    pub command_id: u8,

    pub sequence: u8,

    /// Present only on responses
    pub error_code: Option<u8>,

    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a host-to-robot command packet
    ///
    /// # Errors
    ///
    /// Returns error if payload exceeds [`MAX_PAYLOAD_SIZE`]
    pub fn command(
        target: u8,
        device_id: u8,
        command_id: u8,
        sequence: u8,
        payload: Vec<u8>,
    ) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RvrBridgeError::Protocol(format!(
                "Payload size {} exceeds maximum {}",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        Ok(Self {
            flags: 0,
            target: Some(target),
            source: Some(address::HOST),
            device_id,
            command_id,
            sequence,
            error_code: None,
            payload,
        })
    }

    /// Ask the robot to answer this command
    #[must_use]
    pub fn requesting_response(mut self) -> Self {
        self.flags |= flags::REQUESTS_RESPONSE;
        self
    }

    /// Flag byte as sent on the wire
    pub fn wire_flags(&self) -> u8 {
        let mut wire = self.flags & !(flags::HAS_TARGET | flags::HAS_SOURCE);
        if self.target.is_some() {
            wire |= flags::HAS_TARGET;
        }
        if self.source.is_some() {
            wire |= flags::HAS_SOURCE;
        }
        if self.error_code.is_some() {
            wire |= flags::IS_RESPONSE;
        }
        wire
    }

    pub fn is_response(&self) -> bool {
        self.flags & flags::IS_RESPONSE != 0
    }
}
