//! # Controller Module
//!
//! Exposes the RVR's lights, wheels and sensors as virtual pins.
//!
//! This module handles:
//! - Declaring the fixed digital / analog / servo pin layout
//! - Scaling servo angles into signed wheel speeds
//! - Turning pin writes into light and motor commands
//! - Normalizing streamed sensor samples into analog pin values
//! - Delivering those values to per-port callbacks and event listeners

pub mod actuator;
pub mod events;
pub mod pins;
pub mod rvr;
pub mod scaling;
pub mod sensor;

use events::{Listener, ListenerId};
use pins::{DigitalPinMode, PinDescriptor};
use sensor::ReadCallback;

/// What a robot protocol server needs from a controller.
///
/// Ports are positions within a pin category. Out-of-range ports are never
/// errors: reads return the category default and writes do nothing.
pub trait RobotController {
    fn total_physical_pins(&self) -> usize;

    fn digital_pins(&self) -> &[PinDescriptor];

    fn analog_pins(&self) -> &[PinDescriptor];

    fn servo_pins(&self) -> &[PinDescriptor];

    /// Accepted for protocol compatibility; pin modes are fixed.
    fn set_digital_pin_mode(&mut self, port: usize, mode: DigitalPinMode);

    fn get_digital_value(&self, port: usize) -> bool;

    fn set_digital_value(&mut self, port: usize, value: bool);

    fn get_analog_value(&self, port: usize) -> u16;

    /// Sets a servo angle in degrees; values outside 0-180 are clamped.
    fn set_servo_value(&mut self, port: usize, angle: i32);

    /// Registers `callback` for new values on an analog port.
    ///
    /// Only honored once the controller is ready. The first callback for a
    /// port stays for the controller's lifetime.
    fn subscribe_to_analog_value(&mut self, port: usize, enable: bool, callback: ReadCallback);

    /// Accepted for protocol compatibility; digital pins have no input.
    fn subscribe_to_digital_value(&mut self, port: usize, enable: bool);

    /// Switches every output off.
    fn reset(&mut self);

    fn add_listener(&mut self, listener: Listener) -> ListenerId;

    /// Returns `false` if `id` was not registered.
    fn remove_listener(&mut self, id: ListenerId) -> bool;
}
