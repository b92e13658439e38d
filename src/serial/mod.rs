//! # Serial Communication Module
//!
//! Handles the UART link to the RVR.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control)
//! - Signalling channel readiness or failure to the controller
//! - Draining the command queue into encoded packets (writer task)
//! - Framing and decoding incoming packets into device events (reader task)

pub mod port_trait;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error, info, trace, warn};

use crate::config::SerialConfig;
use crate::device::{DeviceCommand, DeviceEvent};
use crate::error::{Result, RvrBridgeError};
use crate::sphero::decoder::{decode_event, decode_packet, PacketReader};
use crate::sphero::encoder::PacketEncoder;
use port_trait::{SerialPortIO, TokioSerialPort};

/// Size of the buffer used for each serial read
const READ_CHUNK_SIZE: usize = 256;

/// RVR Serial Port Handler
///
/// Owns the opened UART until [`RvrSerial::spawn`] hands it to the I/O tasks.
pub struct RvrSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyS0)
    device_path: String,
}

impl std::fmt::Debug for RvrSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RvrSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl RvrSerial {
    /// Open a serial port with the RVR's UART settings
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyS0")
    /// * `baud_rate` - Line speed, 115200 for the RVR
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the device does not exist, or `Serial`
    /// if it cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rvr_bridge::serial::RvrSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = RvrSerial::open("/dev/ttyS0", 115200)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!("Trying to open serial port: {}", path);

        if !std::path::Path::new(path).exists() {
            return Err(RvrBridgeError::SerialPortNotFound(path.to_string()));
        }

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RvrBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        info!("Successfully opened RVR serial port at {}", path);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Start the writer and reader tasks on this port
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        self,
        commands: UnboundedReceiver<DeviceCommand>,
        events: UnboundedSender<DeviceEvent>,
    ) {
        let (reader, writer) = tokio::io::split(self.port);
        tokio::spawn(run_writer(TokioSerialPort::new(writer), commands));
        tokio::spawn(run_reader(reader, events));
    }
}

/// Open the configured port and report the outcome as a device event
///
/// On success the I/O tasks are spawned and [`DeviceEvent::ChannelOpened`] is
/// sent before any decoded telemetry. On failure a
/// [`DeviceEvent::ChannelError`] is sent and the command queue is dropped.
pub fn connect(
    config: &SerialConfig,
    commands: UnboundedReceiver<DeviceCommand>,
    events: UnboundedSender<DeviceEvent>,
) {
    match RvrSerial::open(&config.port, config.baud_rate) {
        Ok(serial) => {
            let _ = events.send(DeviceEvent::ChannelOpened);
            serial.spawn(commands, events);
        }
        Err(e) => {
            error!("Could not open channel to RVR: {}", e);
            let _ = events.send(DeviceEvent::ChannelError(e.to_string()));
        }
    }
}

/// Drain the command queue onto the port
///
/// Each command is encoded, written and flushed. Failures are logged and the
/// command is dropped; the writer keeps going until the queue closes.
pub async fn run_writer<P: SerialPortIO>(mut port: P, mut commands: UnboundedReceiver<DeviceCommand>) {
    let mut encoder = PacketEncoder::new();

    while let Some(command) = commands.recv().await {
        let frames = match encoder.encode_command(&command) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", command, e);
                continue;
            }
        };

        for frame in &frames {
            if let Err(e) = port.write_all(frame).await {
                warn!("Failed to write {:?}: {}", command, e);
                continue;
            }
            trace!("Sent packet ({} bytes)", frame.len());
        }

        if let Err(e) = port.flush().await {
            warn!("Failed to flush serial port: {}", e);
        }

        debug!("Sent {:?} in {} packet(s)", command, frames.len());
    }

    debug!("Command queue closed, writer stopping");
}

/// Read from the port and forward decoded events
///
/// Stops at end of stream, on a read error, or once nobody listens for events.
pub async fn run_reader<R>(mut reader: R, events: UnboundedSender<DeviceEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut framer = PacketReader::new();
    let mut buf = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                debug!("Serial stream ended, reader stopping");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Serial read failed, reader stopping: {}", e);
                return;
            }
        };

        framer.extend(&buf[..n]);

        while let Some(frame) = framer.next_frame() {
            let packet = match decode_packet(&frame) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!("Dropping malformed packet: {}", e);
                    continue;
                }
            };

            match decode_event(&packet) {
                Ok(Some(event)) => {
                    if events.send(event).is_err() {
                        debug!("Event receiver dropped, reader stopping");
                        return;
                    }
                }
                Ok(None) => trace!(
                    "Ignoring packet did=0x{:02X} cid=0x{:02X}",
                    packet.device_id,
                    packet.command_id
                ),
                Err(e) => debug!("Dropping undecodable packet: {}", e),
            }
        }
    }
}
