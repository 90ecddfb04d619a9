//! Serial transport implementation.
//!
//! VISCA buses run at 9600 baud, 8 data bits, no parity, 1 stop bit and no
//! flow control.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportFuture};

/// Default baud rate for VISCA devices.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-byte read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// How long a single byte read may wait.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the per-byte read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial transport for a VISCA bus.
pub struct SerialTransport {
    config: SerialConfig,
    stream: Option<SerialStream>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub const fn new(config: SerialConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn stream_mut(&mut self) -> Result<&mut SerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "serial port not open",
            ))
        })
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.stream.is_some() {
                return Ok(());
            }

            tracing::info!(
                "opening serial port {} at {} baud",
                self.config.port,
                self.config.baud_rate
            );

            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(self.config.read_timeout)
                .open_native_async()
                .map_err(Error::Serial)?;

            stream.clear(ClearBuffer::All).map_err(Error::Serial)?;
            self.stream = Some(stream);

            tracing::info!("serial port open");
            Ok(())
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.stream.take().is_some() {
                tracing::info!("closed serial port {}", self.config.port);
            }
            Ok(())
        })
    }

    fn write(&mut self, data: Bytes) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            tracing::trace!("writing {} bytes", data.len());
            stream.write_all(&data).await.map_err(Error::Io)?;
            stream.flush().await.map_err(Error::Io)?;
            Ok(())
        })
    }

    fn read_byte(&mut self) -> TransportFuture<'_, Option<u8>> {
        let timeout = self.config.read_timeout;
        Box::pin(async move {
            let stream = self.stream_mut()?;
            match tokio::time::timeout(timeout, stream.read_u8()).await {
                Ok(Ok(byte)) => Ok(Some(byte)),
                Ok(Err(e)) => {
                    tracing::error!("serial read error: {}", e);
                    Err(Error::Io(e))
                }
                Err(_) => Ok(None),
            }
        })
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        let stream = self.stream_mut()?;
        let waiting = stream
            .bytes_to_read()
            .map_err(|e| Error::Io(io::Error::from(e)))?;
        Ok(waiting as usize)
    }

    fn clear(&mut self) -> Result<()> {
        let stream = self.stream_mut()?;
        stream
            .clear(ClearBuffer::All)
            .map_err(|e| Error::Io(io::Error::from(e)))
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
