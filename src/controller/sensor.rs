//! # Sensor Ingest
//!
//! Normalizes streamed telemetry into analog pin values and fans each value
//! out to the pin registry, the port's read callback and event listeners.
//!
//! ## Channel Assignments
//!
//! | Analog port | Source | Input range |
//! |-------------|--------|-------------|
//! | 0 | Accelerometer X | -16 to 16 g |
//! | 1 | Accelerometer Y | -16 to 16 g |
//! | 2 | Accelerometer Z | -16 to 16 g |
//! | 3 | Color red | 0-255 |
//! | 4 | Color green | 0-255 |
//! | 5 | Color blue | 0-255 |
//! | 6 | Color confidence | 0.0-1.0 |
//!
//! All outputs are 0-1023. A color sample without a detection zeroes ports 3-6.

use std::fmt;

use tracing::trace;

use super::events::{ControllerEvent, EventListeners};
use super::pins::PinLayout;
use super::scaling::{clamped_linear_remap, to_analog_value, ANALOG_VALUE_MAX};
use crate::device::{AccelerometerSample, ColorSample};
use crate::sphero::protocol::streaming::{ACCELEROMETER_MAX, ACCELEROMETER_MIN};

/// Analog port indices for semantic access.
pub mod channels {
    pub const ACCEL_X: usize = 0;
    pub const ACCEL_Y: usize = 1;
    pub const ACCEL_Z: usize = 2;
    pub const COLOR_RED: usize = 3;
    pub const COLOR_GREEN: usize = 4;
    pub const COLOR_BLUE: usize = 5;
    pub const COLOR_CONFIDENCE: usize = 6;

    /// Number of analog ports.
    pub const COUNT: usize = 7;
}

const COLOR_COMPONENT_MAX: f64 = 255.0;

/// Callback receiving new values for one analog port.
pub type ReadCallback = Box<dyn FnMut(u16) + Send>;

/// At most one callback per analog port, filled on first subscription.
pub struct ReadCallbacks {
    slots: Vec<Option<ReadCallback>>,
}

impl fmt::Debug for ReadCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(port, slot)| slot.as_ref().map(|_| port))
            .collect();
        f.debug_struct("ReadCallbacks")
            .field("registered", &registered)
            .finish()
    }
}

impl ReadCallbacks {
    pub fn new(num_ports: usize) -> Self {
        Self {
            slots: (0..num_ports).map(|_| None).collect(),
        }
    }

    /// Stores `callback` for `port` unless one is already there.
    ///
    /// Returns `true` only when a new callback was stored.
    pub fn register(&mut self, port: usize, callback: ReadCallback) -> bool {
        match self.slots.get_mut(port) {
            Some(slot) if slot.is_none() => {
                *slot = Some(callback);
                true
            }
            _ => false,
        }
    }

    pub fn is_registered(&self, port: usize) -> bool {
        matches!(self.slots.get(port), Some(Some(_)))
    }

    pub fn notify(&mut self, port: usize, value: u16) {
        if let Some(Some(callback)) = self.slots.get_mut(port) {
            callback(value);
        }
    }
}

/// Maps an accelerometer sample onto ports 0-2.
#[must_use]
pub fn normalize_accelerometer(sample: &AccelerometerSample) -> [(usize, u16); 3] {
    let axis = |g: f32| {
        to_analog_value(clamped_linear_remap(
            g as f64,
            ACCELEROMETER_MIN,
            ACCELEROMETER_MAX,
            0.0,
            ANALOG_VALUE_MAX as f64,
        ))
    };

    [
        (channels::ACCEL_X, axis(sample.x)),
        (channels::ACCEL_Y, axis(sample.y)),
        (channels::ACCEL_Z, axis(sample.z)),
    ]
}

/// Maps a color sample onto ports 3-6.
#[must_use]
pub fn normalize_color(sample: &ColorSample) -> [(usize, u16); 4] {
    if !sample.is_detection() {
        return [
            (channels::COLOR_RED, 0),
            (channels::COLOR_GREEN, 0),
            (channels::COLOR_BLUE, 0),
            (channels::COLOR_CONFIDENCE, 0),
        ];
    }

    let component = |c: u8| {
        to_analog_value(clamped_linear_remap(
            c as f64,
            0.0,
            COLOR_COMPONENT_MAX,
            0.0,
            ANALOG_VALUE_MAX as f64,
        ))
    };
    let confidence = to_analog_value(clamped_linear_remap(
        sample.confidence as f64,
        0.0,
        1.0,
        0.0,
        ANALOG_VALUE_MAX as f64,
    ));

    [
        (channels::COLOR_RED, component(sample.red)),
        (channels::COLOR_GREEN, component(sample.green)),
        (channels::COLOR_BLUE, component(sample.blue)),
        (channels::COLOR_CONFIDENCE, confidence),
    ]
}

/// Telemetry handling state: the per-port read callbacks.
#[derive(Debug)]
pub struct SensorIngest {
    callbacks: ReadCallbacks,
}

impl SensorIngest {
    pub fn new(num_ports: usize) -> Self {
        Self {
            callbacks: ReadCallbacks::new(num_ports),
        }
    }

    /// See [`ReadCallbacks::register`].
    pub fn subscribe(&mut self, port: usize, callback: ReadCallback) -> bool {
        self.callbacks.register(port, callback)
    }

    pub fn is_subscribed(&self, port: usize) -> bool {
        self.callbacks.is_registered(port)
    }

    pub fn ingest_accelerometer(
        &mut self,
        sample: &AccelerometerSample,
        pins: &mut PinLayout,
        listeners: &mut EventListeners,
    ) {
        for (port, value) in normalize_accelerometer(sample) {
            self.dispatch_read(port, value, pins, listeners);
        }
    }

    pub fn ingest_color(
        &mut self,
        sample: &ColorSample,
        pins: &mut PinLayout,
        listeners: &mut EventListeners,
    ) {
        for (port, value) in normalize_color(sample) {
            self.dispatch_read(port, value, pins, listeners);
        }
    }

    /// Records `value` for `port` and tells everyone who cares.
    ///
    /// The registry is updated and listeners get an
    /// [`ControllerEvent::AnalogRead`] whether or not the port has a callback.
    pub fn dispatch_read(
        &mut self,
        port: usize,
        value: u16,
        pins: &mut PinLayout,
        listeners: &mut EventListeners,
    ) {
        trace!("Analog port {} = {}", port, value);
        pins.set_analog(port, value);
        self.callbacks.notify(port, value);
        listeners.emit(&ControllerEvent::AnalogRead { port, value });
    }
}
