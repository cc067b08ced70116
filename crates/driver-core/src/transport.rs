//! Byte transport abstraction and the serial implementation.
//!
//! The protocol layer needs exactly three primitives from the link: write
//! all bytes, read one byte bounded by a timeout, and read until a delimiter.
//! A timed-out read is not an error at this layer: it yields zero bytes and
//! the protocol's echo checks fail on the shortfall.

use std::io::{self, Read as _, Write as _};
use std::time::Duration;

use serialport::SerialPort;
use thiserror::Error;
use tracing::trace;

use crate::framing::hex_dump;

/// Default baud rate for a device connection.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Default read timeout for a device connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Failures of the byte stream itself, distinct from protocol violations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The serial port could not be opened.
    #[error("failed to open serial port {port}: {source}")]
    Open {
        /// Port identifier that was requested.
        port: String,
        /// Underlying serial error.
        #[source]
        source: serialport::Error,
    },
    /// A read or write failed for a reason other than a timeout.
    #[error("serial i/o failed: {0}")]
    Io(#[from] io::Error),
    /// Serial port enumeration failed.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
}

/// Enumerates serial ports visible on the host.
///
/// Returns `(port name, port type)` pairs for connection pickers and
/// diagnostics.
///
/// # Errors
///
/// Returns [`TransportError::Enumerate`] when the host cannot list ports.
pub fn available_ports() -> Result<Vec<(String, &'static str)>, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| (port.port_name, port_type_name(&port.port_type)))
        .collect())
}

fn port_type_name(port_type: &serialport::SerialPortType) -> &'static str {
    match port_type {
        serialport::SerialPortType::UsbPort(_) => "USB",
        serialport::SerialPortType::BluetoothPort => "Bluetooth",
        serialport::SerialPortType::PciPort => "PCI",
        serialport::SerialPortType::Unknown => "Unknown",
    }
}

/// Blocking, timeout-bound duplex byte stream connecting to the device.
///
/// Each session exclusively owns one transport; the protocol assumes strict
/// call/response alternation over it.
pub trait Transport {
    /// Writes all of `bytes` to the device.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying stream fails.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Reads one byte, or `None` when the read timeout expires first.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying stream fails.
    fn read_byte(&mut self) -> Result<Option<u8>, TransportError>;

    /// Reads until `delimiter`, returning the bytes before it.
    ///
    /// The delimiter itself is consumed but not returned. A timeout yields
    /// the (possibly empty) bytes that arrived before it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the underlying stream fails.
    fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>, TransportError> {
        let mut out = Vec::new();
        loop {
            match self.read_byte()? {
                Some(byte) if byte == delimiter => break,
                Some(byte) => out.push(byte),
                None => break,
            }
        }
        Ok(out)
    }
}

/// Serial line configuration for one device connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SerialConfig {
    /// Port identifier, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    /// Baud rate of the link.
    pub baud_rate: u32,
    /// Timeout bounding every blocking read.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Creates a configuration for `port` with default baud rate and timeout.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// [`Transport`] over a physical serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the configured serial port.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] when the port cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;
        Ok(Self { port })
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        trace!(tx = %hex_dump(bytes), len = bytes.len(), "serial write");
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => {
                trace!("serial read timed out");
                Ok(None)
            }
            Ok(_) => {
                trace!(rx = %hex_dump(&buf), "serial read");
                Ok(Some(buf[0]))
            }
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                trace!("serial read timed out");
                Ok(None)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }
}
