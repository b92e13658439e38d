//! # RVR Controller
//!
//! Ties the pin layout, actuator mapper and sensor ingest together behind
//! [`RobotController`], and drives the ready handshake from device events.
//!
//! ## Lifecycle
//!
//! ```text
//! Constructing --new()--> AwaitingReady --ChannelOpened--> Ready
//! ```
//!
//! Construction wakes the robot and asks for its battery level. Sensor
//! streams are enabled and analog subscriptions accepted only once the
//! transport reports an open channel.

use tracing::{debug, info, warn};

use super::actuator::{ActuatorMapper, MotorState};
use super::events::{ControllerEvent, EventListeners, Listener, ListenerId};
use super::pins::{DigitalPinMode, PinDescriptor, PinLayout};
use super::scaling::{SERVO_ANGLE_CENTER, SERVO_ANGLE_MAX, SERVO_ANGLE_MIN};
use super::sensor::{channels, ReadCallback, SensorIngest};
use super::RobotController;
use crate::config::ControllerConfig;
use crate::device::{CommandSink, DeviceCommand, DeviceEvent, SensorStream};
use crate::error::{Result, RvrBridgeError};

/// Number of digital (light) pins.
pub const DIGITAL_PIN_COUNT: usize = 6;
/// Number of analog (sensor) pins.
pub const ANALOG_PIN_COUNT: usize = channels::COUNT;
/// Number of servo (wheel) pins.
pub const SERVO_PIN_COUNT: usize = 2;

/// Where the controller is in its startup handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Constructing,
    AwaitingReady,
    Ready,
}

/// Sphero RVR behind the virtual pin model.
pub struct RvrController<S> {
    state: ControllerState,
    pins: PinLayout,
    actuators: ActuatorMapper<S>,
    sensors: SensorIngest,
    listeners: EventListeners,
    sensor_interval_ms: u16,
    streams: Vec<SensorStream>,
}

impl<S: CommandSink> RvrController<S> {
    /// Builds the pin layout and starts waking the robot.
    ///
    /// # Arguments
    ///
    /// * `sink` - Command queue drained by the transport
    /// * `config` - Light intensity and sensor streaming settings
    pub fn new(sink: S, config: &ControllerConfig) -> Self {
        let mut streams = Vec::new();
        if config.accelerometer {
            streams.push(SensorStream::Accelerometer);
        }
        if config.color_detection {
            streams.push(SensorStream::ColorDetection);
        }

        let mut controller = Self {
            state: ControllerState::Constructing,
            pins: PinLayout::new(DIGITAL_PIN_COUNT, ANALOG_PIN_COUNT, SERVO_PIN_COUNT),
            actuators: ActuatorMapper::new(sink, config.light_intensity),
            sensors: SensorIngest::new(ANALOG_PIN_COUNT),
            listeners: EventListeners::new(),
            sensor_interval_ms: config.sensor_interval_ms,
            streams,
        };

        controller.actuators.issue(DeviceCommand::Wake);
        controller.actuators.issue(DeviceCommand::GetBatteryPercentage);
        controller.state = ControllerState::AwaitingReady;

        controller
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn motor_state(&self) -> MotorState {
        self.actuators.motor_state()
    }

    /// Applies one event from the device layer.
    ///
    /// # Errors
    ///
    /// Returns [`RvrBridgeError::ChannelOpen`] when the transport could not
    /// open its channel. The controller cannot recover from that.
    pub fn handle_device_event(&mut self, event: DeviceEvent) -> Result<()> {
        match event {
            DeviceEvent::ChannelOpened => self.on_channel_opened(),
            DeviceEvent::ChannelError(message) => {
                return Err(RvrBridgeError::ChannelOpen(message));
            }
            DeviceEvent::BatteryPercentage(percent) => {
                info!("RVR battery at {}%", percent);
            }
            DeviceEvent::Accelerometer(sample) => {
                self.sensors
                    .ingest_accelerometer(&sample, &mut self.pins, &mut self.listeners);
            }
            DeviceEvent::ColorDetection(sample) => {
                self.sensors
                    .ingest_color(&sample, &mut self.pins, &mut self.listeners);
            }
        }
        Ok(())
    }

    fn on_channel_opened(&mut self) {
        if self.state != ControllerState::AwaitingReady {
            debug!("Ignoring repeated channel open in state {:?}", self.state);
            return;
        }

        self.state = ControllerState::Ready;
        info!("RVR channel open, controller ready");

        for &stream in &self.streams {
            debug!("Enabling {:?} stream every {}ms", stream, self.sensor_interval_ms);
            self.actuators.issue(DeviceCommand::EnableSensorStream {
                stream,
                interval_ms: self.sensor_interval_ms,
            });
        }

        self.listeners.emit(&ControllerEvent::Ready);
    }
}

impl<S: CommandSink> RobotController for RvrController<S> {
    fn total_physical_pins(&self) -> usize {
        self.pins.total_physical_pins()
    }

    fn digital_pins(&self) -> &[PinDescriptor] {
        self.pins.digital_pins()
    }

    fn analog_pins(&self) -> &[PinDescriptor] {
        self.pins.analog_pins()
    }

    fn servo_pins(&self) -> &[PinDescriptor] {
        self.pins.servo_pins()
    }

    fn set_digital_pin_mode(&mut self, port: usize, mode: DigitalPinMode) {
        debug!("Pin mode {:?} for digital port {} is fixed, ignoring", mode, port);
    }

    fn get_digital_value(&self, port: usize) -> bool {
        self.pins.digital_value(port)
    }

    fn set_digital_value(&mut self, port: usize, value: bool) {
        self.pins.set_digital(port, value);
        self.actuators.write_digital(port, value);
    }

    fn get_analog_value(&self, port: usize) -> u16 {
        self.pins.analog_value(port)
    }

    fn set_servo_value(&mut self, port: usize, angle: i32) {
        self.pins
            .set_servo(port, angle.clamp(SERVO_ANGLE_MIN, SERVO_ANGLE_MAX) as u8);
        self.actuators.write_servo(port, angle);
    }

    fn subscribe_to_analog_value(&mut self, port: usize, enable: bool, callback: ReadCallback) {
        if !enable {
            return;
        }
        if self.state != ControllerState::Ready {
            debug!("Analog port {} subscription before ready, dropping", port);
            return;
        }
        if port >= ANALOG_PIN_COUNT {
            warn!("Analog port {} does not exist", port);
            return;
        }

        if self.sensors.subscribe(port, callback) {
            debug!("Subscribed to analog port {}", port);
        }
    }

    fn subscribe_to_digital_value(&mut self, port: usize, _enable: bool) {
        debug!("Digital port {} has no input, ignoring subscription", port);
    }

    fn reset(&mut self) {
        info!("Resetting RVR outputs");
        self.actuators.reset();
        for port in 0..DIGITAL_PIN_COUNT {
            self.pins.set_digital(port, false);
        }
        for port in 0..SERVO_PIN_COUNT {
            self.pins.set_servo(port, SERVO_ANGLE_CENTER as u8);
        }
    }

    fn add_listener(&mut self, listener: Listener) -> ListenerId {
        self.listeners.register(listener)
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mocks::RecordingSink;
    use crate::controller::pins::{PinMode, PinValue};
    use crate::device::{AccelerometerSample, ColorSample};
    use crate::sphero::protocol::{Led, RawMotorMode};
    use std::sync::{Arc, Mutex};

    fn controller() -> (RecordingSink, RvrController<RecordingSink>) {
        let sink = RecordingSink::new();
        let controller = RvrController::new(sink.clone(), &ControllerConfig::default());
        (sink, controller)
    }

    fn ready_controller() -> (RecordingSink, RvrController<RecordingSink>) {
        let (sink, mut controller) = controller();
        controller.handle_device_event(DeviceEvent::ChannelOpened).unwrap();
        sink.clear();
        (sink, controller)
    }

    fn event_recorder<S: CommandSink>(controller: &mut RvrController<S>) -> Arc<Mutex<Vec<ControllerEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        controller.add_listener(Box::new(move |event: &ControllerEvent| sink.lock().unwrap().push(*event)));
        seen
    }

    fn value_recorder() -> (Arc<Mutex<Vec<u16>>>, ReadCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |value| sink.lock().unwrap().push(value)))
    }

    fn accel(x: f32, y: f32, z: f32) -> DeviceEvent {
        DeviceEvent::Accelerometer(AccelerometerSample { x, y, z })
    }

    // ==================== Lifecycle Tests ====================

    #[test]
    fn test_construction_wakes_robot() {
        let (sink, controller) = controller();

        assert_eq!(controller.state(), ControllerState::AwaitingReady);
        assert_eq!(
            sink.get_commands(),
            vec![DeviceCommand::Wake, DeviceCommand::GetBatteryPercentage]
        );
    }

    #[test]
    fn test_layout() {
        let (_, controller) = controller();

        assert_eq!(controller.total_physical_pins(), 15);
        assert_eq!(controller.digital_pins().len(), 6);
        assert_eq!(controller.analog_pins().len(), 7);
        assert_eq!(controller.servo_pins().len(), 2);
        assert_eq!(controller.analog_pins()[0].hw_pin, 6);
        assert_eq!(controller.servo_pins()[1].hw_pin, 14);
    }

    #[test]
    fn test_channel_opened_enables_streams_and_emits_ready() {
        let (sink, mut controller) = controller();
        let events = event_recorder(&mut controller);
        sink.clear();

        controller.handle_device_event(DeviceEvent::ChannelOpened).unwrap();

        assert_eq!(controller.state(), ControllerState::Ready);
        assert_eq!(
            sink.get_commands(),
            vec![
                DeviceCommand::EnableSensorStream { stream: SensorStream::Accelerometer, interval_ms: 100 },
                DeviceCommand::EnableSensorStream { stream: SensorStream::ColorDetection, interval_ms: 100 },
            ]
        );
        assert_eq!(*events.lock().unwrap(), vec![ControllerEvent::Ready]);
    }

    #[test]
    fn test_repeated_channel_open_is_ignored() {
        let (sink, mut controller) = ready_controller();
        let events = event_recorder(&mut controller);

        controller.handle_device_event(DeviceEvent::ChannelOpened).unwrap();

        assert!(sink.get_commands().is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stream_selection_follows_config() {
        let sink = RecordingSink::new();
        let config = ControllerConfig {
            sensor_interval_ms: 250,
            color_detection: false,
            ..ControllerConfig::default()
        };
        let mut controller = RvrController::new(sink.clone(), &config);
        sink.clear();

        controller.handle_device_event(DeviceEvent::ChannelOpened).unwrap();

        assert_eq!(
            sink.get_commands(),
            vec![DeviceCommand::EnableSensorStream { stream: SensorStream::Accelerometer, interval_ms: 250 }]
        );
    }

    #[test]
    fn test_channel_error_is_fatal() {
        let (_, mut controller) = controller();

        let result = controller.handle_device_event(DeviceEvent::ChannelError("no device".to_string()));

        assert!(matches!(result, Err(RvrBridgeError::ChannelOpen(msg)) if msg == "no device"));
        assert_eq!(controller.state(), ControllerState::AwaitingReady);
    }

    #[test]
    fn test_battery_report_changes_nothing() {
        let (sink, mut controller) = ready_controller();
        controller.handle_device_event(DeviceEvent::BatteryPercentage(87)).unwrap();
        assert!(sink.get_commands().is_empty());
    }

    // ==================== Write Path Tests ====================

    #[test]
    fn test_set_digital_value_drives_light_and_registry() {
        let (sink, mut controller) = ready_controller();

        controller.set_digital_value(0, true);

        assert!(controller.get_digital_value(0));
        assert_eq!(
            sink.get_commands(),
            vec![DeviceCommand::SetSingleLed { led: Led::LeftHeadlight, red: 255, green: 0, blue: 0 }]
        );
    }

    #[test]
    fn test_set_digital_value_out_of_range() {
        let (sink, mut controller) = ready_controller();

        controller.set_digital_value(42, true);

        assert!(!controller.get_digital_value(42));
        assert!(sink.get_commands().is_empty());
    }

    #[test]
    fn test_set_servo_value_drives_wheels() {
        let (sink, mut controller) = ready_controller();

        controller.set_servo_value(0, 55);
        controller.set_servo_value(1, 400);

        assert_eq!(controller.servo_pins()[0].value, PinValue::Servo(55));
        assert_eq!(controller.servo_pins()[1].value, PinValue::Servo(180));
        assert_eq!(controller.motor_state(), MotorState { left_speed: -100, right_speed: 255 });
        assert_eq!(
            sink.get_commands().last(),
            Some(&DeviceCommand::SetRawMotors {
                left_mode: RawMotorMode::Reverse,
                left_speed: 100,
                right_mode: RawMotorMode::Forward,
                right_speed: 255,
            })
        );
    }

    #[test]
    fn test_writes_work_before_ready() {
        let (sink, mut controller) = controller();
        sink.clear();

        controller.set_digital_value(1, true);

        assert_eq!(sink.get_commands().len(), 1);
    }

    #[test]
    fn test_reset_restores_outputs() {
        let (sink, mut controller) = ready_controller();
        controller.set_digital_value(2, true);
        controller.set_servo_value(1, 10);
        sink.clear();

        controller.reset();

        assert!(!controller.get_digital_value(2));
        assert_eq!(controller.servo_pins()[1].value, PinValue::Servo(90));
        assert_eq!(controller.motor_state(), MotorState::default());
        assert_eq!(
            sink.get_commands(),
            vec![
                DeviceCommand::SetAllLeds { red: 0, green: 0, blue: 0 },
                DeviceCommand::SetRawMotors {
                    left_mode: RawMotorMode::Off,
                    left_speed: 0,
                    right_mode: RawMotorMode::Off,
                    right_speed: 0,
                },
            ]
        );
    }

    #[test]
    fn test_pin_mode_and_digital_subscription_are_noops() {
        let (sink, mut controller) = ready_controller();

        controller.set_digital_pin_mode(0, DigitalPinMode::Input);
        controller.subscribe_to_digital_value(0, true);

        assert!(sink.get_commands().is_empty());
        assert_eq!(controller.digital_pins()[0].mode, PinMode::Output);
    }

    // ==================== Read Path Tests ====================

    #[test]
    fn test_accelerometer_sample_updates_analog_pins() {
        let (_, mut controller) = ready_controller();
        let events = event_recorder(&mut controller);

        controller.handle_device_event(accel(16.0, -16.0, 0.0)).unwrap();

        assert_eq!(controller.get_analog_value(0), 1023);
        assert_eq!(controller.get_analog_value(1), 0);
        assert_eq!(controller.get_analog_value(2), 512);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                ControllerEvent::AnalogRead { port: 0, value: 1023 },
                ControllerEvent::AnalogRead { port: 1, value: 0 },
                ControllerEvent::AnalogRead { port: 2, value: 512 },
            ]
        );
    }

    #[test]
    fn test_color_sample_updates_analog_pins() {
        let (_, mut controller) = ready_controller();
        let sample = ColorSample { red: 255, green: 0, blue: 0, index: 3, confidence: 1.0 };

        controller.handle_device_event(DeviceEvent::ColorDetection(sample)).unwrap();

        assert_eq!(controller.get_analog_value(channels::COLOR_RED), 1023);
        assert_eq!(controller.get_analog_value(channels::COLOR_GREEN), 0);
        assert_eq!(controller.get_analog_value(channels::COLOR_CONFIDENCE), 1023);
    }

    #[test]
    fn test_get_analog_value_out_of_range() {
        let (_, controller) = ready_controller();
        assert_eq!(controller.get_analog_value(7), 0);
    }

    #[test]
    fn test_subscription_receives_values() {
        let (_, mut controller) = ready_controller();
        let (values, callback) = value_recorder();

        controller.subscribe_to_analog_value(2, true, callback);
        controller.handle_device_event(accel(0.0, 0.0, 16.0)).unwrap();

        assert_eq!(*values.lock().unwrap(), vec![1023]);
    }

    #[test]
    fn test_first_subscription_wins() {
        let (_, mut controller) = ready_controller();
        let (first, a) = value_recorder();
        let (second, b) = value_recorder();

        controller.subscribe_to_analog_value(0, true, a);
        controller.subscribe_to_analog_value(0, true, b);
        controller.handle_device_event(accel(16.0, 0.0, 0.0)).unwrap();

        assert_eq!(*first.lock().unwrap(), vec![1023]);
        assert!(second.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscription_before_ready_is_dropped() {
        let (_, mut controller) = controller();
        let (values, callback) = value_recorder();

        controller.subscribe_to_analog_value(0, true, callback);
        controller.handle_device_event(DeviceEvent::ChannelOpened).unwrap();
        controller.handle_device_event(accel(16.0, 0.0, 0.0)).unwrap();

        assert!(values.lock().unwrap().is_empty());
        assert_eq!(controller.get_analog_value(0), 1023);
    }

    #[test]
    fn test_disabled_or_invalid_subscription_is_noop() {
        let (_, mut controller) = ready_controller();
        let (disabled, a) = value_recorder();
        let (_, b) = value_recorder();
        let (later, c) = value_recorder();

        controller.subscribe_to_analog_value(0, false, a);
        controller.subscribe_to_analog_value(99, true, b);
        controller.subscribe_to_analog_value(0, true, c);
        controller.handle_device_event(accel(-16.0, 0.0, 0.0)).unwrap();

        assert!(disabled.lock().unwrap().is_empty());
        assert_eq!(*later.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_removed_listener_stops_receiving() {
        let (_, mut controller) = ready_controller();
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let id = controller.add_listener(Box::new(move |_: &ControllerEvent| *counter.lock().unwrap() += 1));

        controller.handle_device_event(accel(0.0, 0.0, 0.0)).unwrap();
        assert!(controller.remove_listener(id));
        controller.handle_device_event(accel(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(*seen.lock().unwrap(), 3);
    }
}
