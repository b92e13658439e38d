//! # Sphero Packet Encoder
//!
//! Turns [`DeviceCommand`]s into framed, escaped Sphero API packets.

use super::checksum::{checksum, escape};
use super::protocol::*;
use crate::device::{DeviceCommand, SensorStream};
use crate::error::Result;

/// Encode a packet into a complete frame
///
/// # Returns
///
/// * `Vec<u8>` - `SOP | escaped(body | checksum) | EOP`
///
/// # Examples
///
/// ```
/// use rvr_bridge::sphero::encoder::encode_packet;
/// use rvr_bridge::sphero::protocol::{address, command_id, device_id, Packet, EOP, SOP};
///
/// let packet = Packet::command(address::NORDIC, device_id::POWER, command_id::WAKE, 0, vec![]).unwrap();
/// let frame = encode_packet(&packet);
/// assert_eq!(frame.first(), Some(&SOP));
/// assert_eq!(frame.last(), Some(&EOP));
/// ```
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    let mut body = Vec::with_capacity(8 + packet.payload.len());
    body.push(packet.wire_flags());
    if let Some(target) = packet.target {
        body.push(target);
    }
    if let Some(source) = packet.source {
        body.push(source);
    }
    body.push(packet.device_id);
    body.push(packet.command_id);
    body.push(packet.sequence);
    if let Some(error_code) = packet.error_code {
        body.push(error_code);
    }
    body.extend_from_slice(&packet.payload);
    body.push(checksum(&body));

    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.push(SOP);
    frame.extend_from_slice(&escape(&body));
    frame.push(EOP);
    frame
}

/// Payload for the 32-bit-mask LED command: mask followed by one byte per set bit
fn led_payload(groups: &[(Led, [u8; 3])]) -> Vec<u8> {
    let mask = groups.iter().fold(0u32, |mask, (led, _)| mask | led.mask());

    // Brightness bytes are ordered by ascending mask bit, not by argument order
    let mut ordered: Vec<&(Led, [u8; 3])> = groups.iter().collect();
    ordered.sort_by_key(|(led, _)| *led as u8);

    let mut payload = Vec::with_capacity(4 + groups.len() * 3);
    payload.extend_from_slice(&mask.to_be_bytes());
    for (_, rgb) in ordered {
        payload.extend_from_slice(rgb);
    }
    payload
}

/// Stateful encoder that assigns sequence numbers
#[derive(Debug, Default)]
pub struct PacketEncoder {
    next_sequence: u8,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence(&mut self) -> u8 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        sequence
    }

    fn command(&mut self, target: u8, device_id: u8, command_id: u8, payload: Vec<u8>) -> Result<Packet> {
        let sequence = self.sequence();
        Packet::command(target, device_id, command_id, sequence, payload)
    }

    /// Build the packets that carry out one device command
    ///
    /// Most commands map to a single packet. Enabling a sensor stream takes
    /// several (enable the sensor if needed, configure the slot, start it).
    ///
    /// # Errors
    ///
    /// Returns error if a payload exceeds the protocol maximum
    pub fn packets_for(&mut self, command: &DeviceCommand) -> Result<Vec<Packet>> {
        let packets = match *command {
            DeviceCommand::Wake => vec![self.command(
                address::NORDIC,
                device_id::POWER,
                command_id::WAKE,
                vec![],
            )?],

            DeviceCommand::GetBatteryPercentage => vec![self
                .command(
                    address::NORDIC,
                    device_id::POWER,
                    command_id::GET_BATTERY_PERCENTAGE,
                    vec![],
                )?
                .requesting_response()],

            DeviceCommand::SetSingleLed { led, red, green, blue } => vec![self.command(
                address::ST,
                device_id::IO,
                command_id::SET_ALL_LEDS,
                led_payload(&[(led, [red, green, blue])]),
            )?],

            DeviceCommand::SetAllLeds { red, green, blue } => {
                let groups: Vec<(Led, [u8; 3])> =
                    Led::ALL.iter().map(|&led| (led, [red, green, blue])).collect();
                vec![self.command(
                    address::ST,
                    device_id::IO,
                    command_id::SET_ALL_LEDS,
                    led_payload(&groups),
                )?]
            }

            DeviceCommand::SetRawMotors { left_mode, left_speed, right_mode, right_speed } => {
                vec![self.command(
                    address::ST,
                    device_id::DRIVE,
                    command_id::SET_RAW_MOTORS,
                    vec![left_mode as u8, left_speed, right_mode as u8, right_speed],
                )?]
            }

            DeviceCommand::EnableSensorStream { stream, interval_ms } => {
                self.stream_packets(stream, interval_ms)?
            }
        };

        Ok(packets)
    }

    fn stream_packets(&mut self, stream: SensorStream, interval_ms: u16) -> Result<Vec<Packet>> {
        let (target, token, service, data_size) = match stream {
            SensorStream::Accelerometer => (
                address::ST,
                streaming::ACCELEROMETER_TOKEN,
                streaming::ACCELEROMETER_SERVICE,
                streaming::DATA_SIZE_32_BIT,
            ),
            SensorStream::ColorDetection => (
                address::NORDIC,
                streaming::COLOR_DETECTION_TOKEN,
                streaming::COLOR_DETECTION_SERVICE,
                streaming::DATA_SIZE_8_BIT,
            ),
        };

        let mut packets = Vec::with_capacity(3);

        if stream == SensorStream::ColorDetection {
            // The color sensor (and its illumination LED) is off until enabled
            packets.push(self.command(
                target,
                device_id::SENSOR,
                command_id::ENABLE_COLOR_DETECTION,
                vec![1],
            )?);
        }

        let service_bytes = service.to_be_bytes();
        packets.push(self.command(
            target,
            device_id::SENSOR,
            command_id::CONFIGURE_STREAMING_SERVICE,
            vec![token, service_bytes[0], service_bytes[1], data_size],
        )?);

        let period = interval_ms.to_be_bytes();
        packets.push(self.command(
            target,
            device_id::SENSOR,
            command_id::START_STREAMING_SERVICE,
            vec![period[0], period[1]],
        )?);

        Ok(packets)
    }

    /// Build and frame the packets for one device command
    ///
    /// # Errors
    ///
    /// Returns error if a payload exceeds the protocol maximum
    pub fn encode_command(&mut self, command: &DeviceCommand) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .packets_for(command)?
            .iter()
            .map(encode_packet)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphero::protocol::flags;

    #[test]
    fn test_encode_wake_frame() {
        let packet = Packet::command(address::NORDIC, device_id::POWER, command_id::WAKE, 0x05, vec![]).unwrap();
        let frame = encode_packet(&packet);

        let body = [flags::HAS_TARGET | flags::HAS_SOURCE, address::NORDIC, address::HOST, device_id::POWER, command_id::WAKE, 0x05];
        let mut expected = vec![SOP];
        expected.extend_from_slice(&body);
        expected.push(checksum(&body));
        expected.push(EOP);

        assert_eq!(frame, expected);
    }

    #[test]
    fn test_encode_escapes_framing_bytes_in_payload() {
        let packet = Packet::command(address::ST, device_id::DRIVE, command_id::SET_RAW_MOTORS, 0, vec![SOP, EOP]).unwrap();
        let frame = encode_packet(&packet);

        // Only the first and last bytes may be framing bytes
        let inner = &frame[1..frame.len() - 1];
        assert!(!inner.contains(&SOP));
        assert!(!inner.contains(&EOP));
        assert!(inner.windows(2).any(|w| w == [ESC, ESCAPED_SOP]));
        assert!(inner.windows(2).any(|w| w == [ESC, ESCAPED_EOP]));
    }

    #[test]
    fn test_sequence_numbers_increment_and_wrap() {
        let mut encoder = PacketEncoder { next_sequence: 254 };
        let a = encoder.packets_for(&DeviceCommand::Wake).unwrap();
        let b = encoder.packets_for(&DeviceCommand::Wake).unwrap();
        let c = encoder.packets_for(&DeviceCommand::Wake).unwrap();
        assert_eq!(a[0].sequence, 254);
        assert_eq!(b[0].sequence, 255);
        assert_eq!(c[0].sequence, 0);
    }

    #[test]
    fn test_battery_query_requests_response() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder.packets_for(&DeviceCommand::GetBatteryPercentage).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].device_id, device_id::POWER);
        assert_eq!(packets[0].command_id, command_id::GET_BATTERY_PERCENTAGE);
        assert_ne!(packets[0].flags & flags::REQUESTS_RESPONSE, 0);
    }

    #[test]
    fn test_single_led_payload() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder
            .packets_for(&DeviceCommand::SetSingleLed { led: Led::LeftHeadlight, red: 255, green: 0, blue: 0 })
            .unwrap();

        assert_eq!(packets[0].device_id, device_id::IO);
        assert_eq!(packets[0].command_id, command_id::SET_ALL_LEDS);
        assert_eq!(packets[0].payload, vec![0x00, 0x00, 0x00, 0x38, 255, 0, 0]);
    }

    #[test]
    fn test_all_leds_payload() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder
            .packets_for(&DeviceCommand::SetAllLeds { red: 1, green: 2, blue: 3 })
            .unwrap();

        let payload = &packets[0].payload;
        assert_eq!(&payload[..4], &[0x3F, 0xFF, 0xFF, 0xFF]);
        assert_eq!(payload.len(), 4 + 30);
        for rgb in payload[4..].chunks(3) {
            assert_eq!(rgb, &[1, 2, 3]);
        }
    }

    #[test]
    fn test_led_payload_orders_by_mask_bit() {
        let payload = led_payload(&[
            (Led::LeftHeadlight, [4, 5, 6]),
            (Led::RightHeadlight, [1, 2, 3]),
        ]);
        assert_eq!(payload, vec![0x00, 0x00, 0x00, 0x3F, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_raw_motors_payload() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder
            .packets_for(&DeviceCommand::SetRawMotors {
                left_mode: RawMotorMode::Reverse,
                left_speed: 100,
                right_mode: RawMotorMode::Forward,
                right_speed: 50,
            })
            .unwrap();

        assert_eq!(packets[0].target, Some(address::ST));
        assert_eq!(packets[0].device_id, device_id::DRIVE);
        assert_eq!(packets[0].payload, vec![2, 100, 1, 50]);
    }

    #[test]
    fn test_accelerometer_stream_packets() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder
            .packets_for(&DeviceCommand::EnableSensorStream { stream: SensorStream::Accelerometer, interval_ms: 100 })
            .unwrap();

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].command_id, command_id::CONFIGURE_STREAMING_SERVICE);
        assert_eq!(packets[0].payload, vec![streaming::ACCELEROMETER_TOKEN, 0x02, 0x02, streaming::DATA_SIZE_32_BIT]);
        assert_eq!(packets[1].command_id, command_id::START_STREAMING_SERVICE);
        assert_eq!(packets[1].payload, vec![0x00, 0x64]);
        assert!(packets.iter().all(|p| p.target == Some(address::ST)));
    }

    #[test]
    fn test_color_stream_enables_sensor_first() {
        let mut encoder = PacketEncoder::new();
        let packets = encoder
            .packets_for(&DeviceCommand::EnableSensorStream { stream: SensorStream::ColorDetection, interval_ms: 100 })
            .unwrap();

        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].command_id, command_id::ENABLE_COLOR_DETECTION);
        assert_eq!(packets[0].payload, vec![1]);
        assert_eq!(packets[1].payload, vec![streaming::COLOR_DETECTION_TOKEN, 0x00, 0x03, streaming::DATA_SIZE_8_BIT]);
        assert!(packets.iter().all(|p| p.target == Some(address::NORDIC)));
    }

    #[test]
    fn test_encode_command_frames_every_packet() {
        let mut encoder = PacketEncoder::new();
        let frames = encoder
            .encode_command(&DeviceCommand::EnableSensorStream { stream: SensorStream::ColorDetection, interval_ms: 100 })
            .unwrap();

        assert_eq!(frames.len(), 3);
        for frame in frames {
            assert_eq!(frame[0], SOP);
            assert_eq!(*frame.last().unwrap(), EOP);
        }
    }
}
