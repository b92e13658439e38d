//! Trait abstraction for serial port writes to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Wrapper around the write half of a tokio serial stream
pub struct TokioSerialPort<W> {
    port: W,
}

impl<W> TokioSerialPort<W> {
    pub fn new(port: W) -> Self {
        Self { port }
    }
}

#[async_trait]
impl<W> SerialPortIO for TokioSerialPort<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(&mut self.port, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(&mut self.port).await
    }
}
