//! # Actuator Mapper
//!
//! Turns digital and servo pin writes into light and motor commands.
//!
//! ## Port Assignments
//!
//! | Digital port | Light |
//! |--------------|-------|
//! | 0 | Left headlight |
//! | 1 | Right headlight |
//! | 2 | Left brakelight |
//! | 3 | Right brakelight |
//! | 4 | Left status |
//! | 5 | Right status |
//!
//! | Servo port | Wheel |
//! |------------|-------|
//! | 0 | Left |
//! | 1 | Right |
//!
//! The RVR only accepts both wheels in one raw motor command, so every servo
//! write re-sends the last speed of the other wheel along with the new one.

use std::collections::HashMap;

use tracing::debug;

use super::scaling::servo_angle_to_motor_value;
use crate::device::{CommandSink, DeviceCommand};
use crate::sphero::protocol::{Led, RawMotorMode};

/// Servo port driving the left wheel.
pub const LEFT_WHEEL_PORT: usize = 0;
/// Servo port driving the right wheel.
pub const RIGHT_WHEEL_PORT: usize = 1;

/// Digital port to light assignments.
pub const DIGITAL_PORT_LEDS: [(usize, Led); 6] = [
    (0, Led::LeftHeadlight),
    (1, Led::RightHeadlight),
    (2, Led::LeftBrakelight),
    (3, Led::RightBrakelight),
    (4, Led::LeftStatus),
    (5, Led::RightStatus),
];

/// Last commanded speed of each wheel (-255 to 255).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorState {
    pub left_speed: i32,
    pub right_speed: i32,
}

/// Mode and magnitude for one wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommand {
    pub mode: RawMotorMode,
    pub magnitude: u8,
}

impl WheelCommand {
    /// Splits a signed speed into a drive mode and magnitude.
    #[must_use]
    pub fn from_speed(speed: i32) -> Self {
        let magnitude = speed.unsigned_abs().min(u8::MAX as u32) as u8;
        let mode = match speed {
            s if s < 0 => RawMotorMode::Reverse,
            s if s > 0 => RawMotorMode::Forward,
            _ => RawMotorMode::Off,
        };
        Self { mode, magnitude }
    }
}

/// Both wheels' mode and magnitude, sent as one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub left: WheelCommand,
    pub right: WheelCommand,
}

impl From<MotorCommand> for DeviceCommand {
    fn from(command: MotorCommand) -> Self {
        DeviceCommand::SetRawMotors {
            left_mode: command.left.mode,
            left_speed: command.left.magnitude,
            right_mode: command.right.mode,
            right_speed: command.right.magnitude,
        }
    }
}

/// Decomposes signed wheel speeds into the combined motor command.
///
/// # Examples
///
/// ```
/// use rvr_bridge::controller::actuator::derive_motor_command;
/// use rvr_bridge::sphero::protocol::RawMotorMode;
///
/// let command = derive_motor_command(-100, 50);
/// assert_eq!(command.left.mode, RawMotorMode::Reverse);
/// assert_eq!(command.left.magnitude, 100);
/// assert_eq!(command.right.mode, RawMotorMode::Forward);
/// assert_eq!(command.right.magnitude, 50);
/// ```
#[must_use]
pub fn derive_motor_command(left_speed: i32, right_speed: i32) -> MotorCommand {
    MotorCommand {
        left: WheelCommand::from_speed(left_speed),
        right: WheelCommand::from_speed(right_speed),
    }
}

/// Converts pin writes into device commands.
pub struct ActuatorMapper<S> {
    sink: S,
    digital_port_leds: HashMap<usize, Led>,
    motors: MotorState,
    light_intensity: u8,
}

impl<S: CommandSink> ActuatorMapper<S> {
    /// Creates a mapper with the standard light assignments.
    ///
    /// # Arguments
    ///
    /// * `sink` - Where commands go
    /// * `light_intensity` - Red channel value for a light that is switched on
    pub fn new(sink: S, light_intensity: u8) -> Self {
        Self {
            sink,
            digital_port_leds: DIGITAL_PORT_LEDS.into_iter().collect(),
            motors: MotorState::default(),
            light_intensity,
        }
    }

    pub fn motor_state(&self) -> MotorState {
        self.motors
    }

    /// Light driven by a digital port, if any.
    pub fn led_for_port(&self, port: usize) -> Option<Led> {
        self.digital_port_leds.get(&port).copied()
    }

    /// Passes a command that has no pin behind it straight to the device.
    pub fn issue(&mut self, command: DeviceCommand) {
        self.sink.send(command);
    }

    /// Switches the light behind `port` on (red) or off.
    ///
    /// Ports without a light are ignored.
    pub fn write_digital(&mut self, port: usize, value: bool) {
        let Some(led) = self.led_for_port(port) else {
            debug!("Digital port {} has no light, ignoring write", port);
            return;
        };

        let red = if value { self.light_intensity } else { 0 };
        self.sink.send(DeviceCommand::SetSingleLed { led, red, green: 0, blue: 0 });
    }

    /// Sets one wheel's speed from a servo angle and sends both wheels.
    ///
    /// Ports other than the two wheel ports leave the speeds untouched but
    /// still re-send the current motor command.
    pub fn write_servo(&mut self, port: usize, angle: i32) {
        let speed = servo_angle_to_motor_value(angle);

        match port {
            LEFT_WHEEL_PORT => self.motors.left_speed = speed,
            RIGHT_WHEEL_PORT => self.motors.right_speed = speed,
            _ => debug!("Servo port {} has no wheel", port),
        }

        self.send_motors();
    }

    fn send_motors(&mut self) {
        let command = derive_motor_command(self.motors.left_speed, self.motors.right_speed);
        self.sink.send(command.into());
    }

    /// Turns every light off and stops both wheels.
    pub fn reset(&mut self) {
        self.sink.send(DeviceCommand::SetAllLeds { red: 0, green: 0, blue: 0 });
        self.motors = MotorState::default();
        self.send_motors();
    }
}
