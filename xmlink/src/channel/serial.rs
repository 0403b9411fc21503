//! Serial port binding for the byte channel (native platforms).
//!
//! XMODEM runs over an 8-bit line, so the port is always opened 8-N-1 with
//! no flow control; only the device path and baud rate vary. The port read
//! timeout doubles as the poll interval: an expired read surfaces as
//! [`ReadOutcome::Empty`], which is what keeps the protocol's retry loops
//! ticking instead of hanging on a dead line.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::trace;

use crate::channel::{ByteChannel, ReadOutcome};
use crate::error::Result;

/// Serial line settings for an XMODEM link.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Port name/path (e.g., "/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Upper bound on how long a single-byte poll may block.
    pub poll_interval: Duration,
}

impl SerialConfig {
    /// Create a configuration with port name and baud rate.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            poll_interval: Duration::from_millis(20),
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Serial port information, as reported by the operating system.
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Product string (if available).
    pub product: Option<String>,
}

/// List all serial ports known to the operating system.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (vid, pid, product) = match &p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    (Some(info.vid), Some(info.pid), info.product.clone())
                }
                _ => (None, None, None),
            };
            PortInfo {
                name: p.port_name,
                vid,
                pid,
                product,
            }
        })
        .collect())
}

/// Byte channel over a native serial port.
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialChannel {
    /// Open a serial port with the given configuration.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        trace!(
            "opening {} at {} baud, poll interval {:?}",
            config.port_name, config.baud_rate, config.poll_interval
        );
        let port = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.poll_interval)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()?;
        Ok(Self {
            port,
            name: config.port_name.clone(),
        })
    }

    /// Open a serial port with default settings.
    pub fn open_simple(port_name: &str, baud_rate: u32) -> Result<Self> {
        Self::open(&SerialConfig::new(port_name, baud_rate))
    }

    /// Port name this channel was opened on.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discard bytes buffered before the session started.
    pub fn clear(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        Ok(())
    }
}

impl ByteChannel for SerialChannel {
    fn read_byte(&mut self) -> io::Result<ReadOutcome> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(ReadOutcome::Empty),
            Ok(_) => Ok(ReadOutcome::Byte(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(ReadOutcome::Empty),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadOutcome::Empty),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()
    }
}
