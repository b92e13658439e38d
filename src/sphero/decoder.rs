//! # Sphero Packet Decoder
//!
//! Splits the incoming byte stream into frames, validates them, and turns
//! the packets the bridge cares about (battery responses and streaming
//! sensor data) into [`DeviceEvent`]s.

use bytes::{Buf, BytesMut};

use super::checksum::{checksum, unescape};
use super::protocol::*;
use crate::device::{AccelerometerSample, ColorSample, DeviceEvent};
use crate::error::{Result, RvrBridgeError};

/// Largest escaped frame accepted before the reader gives up on a partial frame
const MAX_FRAME_SIZE: usize = 2 * (MAX_PAYLOAD_SIZE + 16);

/// Decode a complete frame (SOP through EOP)
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short or not delimited by SOP/EOP
/// - Escaping is malformed
/// - Checksum does not match
pub fn decode_packet(frame: &[u8]) -> Result<Packet> {
    if frame.len() < 2 || frame[0] != SOP || frame[frame.len() - 1] != EOP {
        return Err(RvrBridgeError::Protocol(
            "Frame is not delimited by SOP/EOP".to_string(),
        ));
    }

    let body = unescape(&frame[1..frame.len() - 1])?;

    // flags + did + cid + seq + checksum
    if body.len() < 5 {
        return Err(RvrBridgeError::Protocol(format!(
            "Frame too short: {} body bytes",
            body.len()
        )));
    }

    let (data, received) = body.split_at(body.len() - 1);
    let calculated = checksum(data);
    if calculated != received[0] {
        return Err(RvrBridgeError::Protocol(format!(
            "Checksum mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated, received[0]
        )));
    }

    let packet_flags = data[0];
    let mut cursor = 1;
    let mut take = |what: &str| -> Result<u8> {
        let byte = data.get(cursor).copied().ok_or_else(|| {
            RvrBridgeError::Protocol(format!("Frame truncated before {}", what))
        })?;
        cursor += 1;
        Ok(byte)
    };

    let target = if packet_flags & flags::HAS_TARGET != 0 { Some(take("target")?) } else { None };
    let source = if packet_flags & flags::HAS_SOURCE != 0 { Some(take("source")?) } else { None };
    let device_id = take("device id")?;
    let command_id = take("command id")?;
    let sequence = take("sequence")?;
    let error_code = if packet_flags & flags::IS_RESPONSE != 0 { Some(take("error code")?) } else { None };

    Ok(Packet {
        flags: packet_flags,
        target,
        source,
        device_id,
        command_id,
        sequence,
        error_code,
        payload: data[cursor..].to_vec(),
    })
}

/// Accumulates serial bytes and yields whole frames
#[derive(Debug, Default)]
pub struct PacketReader {
    buffer: BytesMut,
}

impl PacketReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the port
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pop the next complete frame, if one is buffered
    ///
    /// Bytes before a SOP are discarded. A partial frame that grows past
    /// the size limit is dropped so a lost EOP cannot stall the stream.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let start = match self.buffer.iter().position(|&b| b == SOP) {
                Some(start) => start,
                None => {
                    self.buffer.clear();
                    return None;
                }
            };
            self.buffer.advance(start);

            // A second SOP before any EOP means the first frame was cut short
            if let Some(restart) = self.buffer[1..].iter().position(|&b| b == SOP || b == EOP) {
                let idx = restart + 1;
                if self.buffer[idx] == SOP {
                    self.buffer.advance(idx);
                    continue;
                }
                return Some(self.buffer.split_to(idx + 1).to_vec());
            }

            if self.buffer.len() > MAX_FRAME_SIZE {
                self.buffer.clear();
            }
            return None;
        }
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Read a 32-bit normalized streaming slot into `[min, max]`
fn normalized_u32(bytes: &[u8], min: f64, max: f64) -> f32 {
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (min + (raw as f64 / u32::MAX as f64) * (max - min)) as f32
}

/// Decode the accelerometer streaming slot (three 32-bit values)
///
/// # Errors
///
/// Returns error if the data is shorter than 12 bytes
pub fn decode_accelerometer(data: &[u8]) -> Result<AccelerometerSample> {
    if data.len() < 12 {
        return Err(RvrBridgeError::Protocol(format!(
            "Accelerometer data too short: {} bytes",
            data.len()
        )));
    }

    let axis = |i: usize| {
        normalized_u32(
            &data[i * 4..i * 4 + 4],
            streaming::ACCELEROMETER_MIN,
            streaming::ACCELEROMETER_MAX,
        )
    };

    Ok(AccelerometerSample {
        x: axis(0),
        y: axis(1),
        z: axis(2),
    })
}

/// Decode the color detection streaming slot (red, green, blue, index, confidence)
///
/// # Errors
///
/// Returns error if the data is shorter than 5 bytes
pub fn decode_color_detection(data: &[u8]) -> Result<ColorSample> {
    if data.len() < 5 {
        return Err(RvrBridgeError::Protocol(format!(
            "Color detection data too short: {} bytes",
            data.len()
        )));
    }

    Ok(ColorSample {
        red: data[0],
        green: data[1],
        blue: data[2],
        index: data[3],
        confidence: data[4] as f32 / 255.0,
    })
}

/// Map a decoded packet onto a device event
///
/// # Returns
///
/// * `Ok(None)` - the packet is valid but not interesting to the bridge
///   (command acknowledgements, unknown notifications)
///
/// # Errors
///
/// Returns error if a recognised packet carries a malformed payload
pub fn decode_event(packet: &Packet) -> Result<Option<DeviceEvent>> {
    match (packet.device_id, packet.command_id) {
        (device_id::POWER, command_id::GET_BATTERY_PERCENTAGE) if packet.is_response() => {
            match packet.payload.first() {
                Some(&percentage) => Ok(Some(DeviceEvent::BatteryPercentage(percentage))),
                None => Err(RvrBridgeError::Protocol(
                    "Battery percentage response without payload".to_string(),
                )),
            }
        }

        (device_id::SENSOR, command_id::STREAMING_SERVICE_DATA) => {
            let (&token, data) = packet.payload.split_first().ok_or_else(|| {
                RvrBridgeError::Protocol("Streaming data without token".to_string())
            })?;

            match token {
                streaming::ACCELEROMETER_TOKEN => {
                    Ok(Some(DeviceEvent::Accelerometer(decode_accelerometer(data)?)))
                }
                streaming::COLOR_DETECTION_TOKEN => {
                    Ok(Some(DeviceEvent::ColorDetection(decode_color_detection(data)?)))
                }
                _ => Ok(None),
            }
        }

        _ => Ok(None),
    }
}
