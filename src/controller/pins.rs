//! # Pin Layout Registry
//!
//! The fixed set of virtual pins the controller exposes, their hardware pin
//! numbers, supported modes and last known values.
//!
//! Hardware pin numbers are assigned in one contiguous run: digital pins
//! first, then analog, then servo. A pin's position within its category is
//! its externally visible port index.

use super::scaling::SERVO_ANGLE_CENTER;

/// Capability of a pin, with its Firmata mode code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Output,
    AnalogInput,
    Servo,
}

impl PinMode {
    /// Firmata mode number reported to protocol clients.
    pub fn firmata_code(self) -> u8 {
        match self {
            PinMode::Output => 0x01,
            PinMode::AnalogInput => 0x02,
            PinMode::Servo => 0x04,
        }
    }
}

/// Modes a client may request for a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalPinMode {
    Input,
    InputPullup,
    Output,
}

/// Last known value of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    Digital(bool),
    /// 0-1023
    Analog(u16),
    /// 0-180
    Servo(u8),
}

/// Description of one virtual pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    pub hw_pin: u32,
    pub mode: PinMode,
    pub supported_modes: Vec<PinMode>,
    pub value: PinValue,
}

impl PinDescriptor {
    fn new(hw_pin: u32, mode: PinMode, value: PinValue) -> Self {
        Self {
            hw_pin,
            mode,
            supported_modes: vec![mode],
            value,
        }
    }
}

/// Registry of every virtual pin, by category.
///
/// # Examples
///
/// ```
/// use rvr_bridge::controller::pins::{PinLayout, PinValue};
///
/// let layout = PinLayout::new(6, 7, 2);
/// assert_eq!(layout.total_physical_pins(), 15);
/// assert_eq!(layout.servo_pins()[0].hw_pin, 13);
/// assert_eq!(layout.servo_pins()[0].value, PinValue::Servo(90));
/// ```
#[derive(Debug, Clone)]
pub struct PinLayout {
    digital: Vec<PinDescriptor>,
    analog: Vec<PinDescriptor>,
    servo: Vec<PinDescriptor>,
}

impl PinLayout {
    /// Builds a layout with contiguous hardware pin numbers and initial values.
    #[must_use]
    pub fn new(num_digital: usize, num_analog: usize, num_servo: usize) -> Self {
        let analog_start = num_digital;
        let servo_start = num_digital + num_analog;

        let digital = (0..num_digital)
            .map(|i| PinDescriptor::new(i as u32, PinMode::Output, PinValue::Digital(false)))
            .collect();

        let analog = (0..num_analog)
            .map(|i| {
                PinDescriptor::new((analog_start + i) as u32, PinMode::AnalogInput, PinValue::Analog(0))
            })
            .collect();

        let servo = (0..num_servo)
            .map(|i| {
                PinDescriptor::new(
                    (servo_start + i) as u32,
                    PinMode::Servo,
                    PinValue::Servo(SERVO_ANGLE_CENTER as u8),
                )
            })
            .collect();

        Self { digital, analog, servo }
    }

    pub fn digital_pins(&self) -> &[PinDescriptor] {
        &self.digital
    }

    pub fn analog_pins(&self) -> &[PinDescriptor] {
        &self.analog
    }

    pub fn servo_pins(&self) -> &[PinDescriptor] {
        &self.servo
    }

    pub fn total_physical_pins(&self) -> usize {
        self.digital.len() + self.analog.len() + self.servo.len()
    }

    /// Last written digital value; `false` for unknown ports.
    pub fn digital_value(&self, port: usize) -> bool {
        match self.digital.get(port).map(|pin| pin.value) {
            Some(PinValue::Digital(value)) => value,
            _ => false,
        }
    }

    /// Last ingested analog value; `0` for unknown ports.
    pub fn analog_value(&self, port: usize) -> u16 {
        match self.analog.get(port).map(|pin| pin.value) {
            Some(PinValue::Analog(value)) => value,
            _ => 0,
        }
    }

    /// Last written servo angle; the center angle for unknown ports.
    pub fn servo_value(&self, port: usize) -> u8 {
        match self.servo.get(port).map(|pin| pin.value) {
            Some(PinValue::Servo(value)) => value,
            _ => SERVO_ANGLE_CENTER as u8,
        }
    }

    pub(crate) fn set_digital(&mut self, port: usize, value: bool) {
        if let Some(pin) = self.digital.get_mut(port) {
            pin.value = PinValue::Digital(value);
        }
    }

    pub(crate) fn set_analog(&mut self, port: usize, value: u16) {
        if let Some(pin) = self.analog.get_mut(port) {
            pin.value = PinValue::Analog(value);
        }
    }

    pub(crate) fn set_servo(&mut self, port: usize, angle: u8) {
        if let Some(pin) = self.servo.get_mut(port) {
            pin.value = PinValue::Servo(angle);
        }
    }
}
