//! Byte channel abstraction.
//!
//! The protocol engine never talks to a serial port directly. It consumes a
//! [`ByteChannel`]: a half-duplex byte stream with a bounded single-byte
//! poll and a blocking bulk write. Implementations may bind a real serial
//! port (see [`serial`]), a TCP stream, or an in-memory pipe for tests.
//!
//! ```text
//! +--------------------+
//! |  Protocol engine   |
//! | (sender, receiver) |
//! +---------+----------+
//!           |
//!           v
//! +---------+----------+
//! |  ByteChannel trait |
//! +---------+----------+
//!           |
//!           v
//! +---------+----------+
//! |  SerialChannel     |
//! |  (serialport)      |
//! +--------------------+
//! ```

#[cfg(feature = "native")]
pub mod serial;

use std::io;

/// Outcome of a single-byte poll on a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One byte arrived.
    Byte(u8),
    /// Nothing is pending right now; the poll returned within its bounded
    /// interval.
    Empty,
}

/// A half-duplex byte stream driven one byte at a time.
///
/// The protocol engine relies on two properties: `read_byte` returns within
/// a small bounded interval even when the line is idle (it never blocks
/// until data arrives), and bytes that arrived between polls are buffered
/// by the transport rather than lost.
pub trait ByteChannel {
    /// Poll for a single byte.
    fn read_byte(&mut self) -> io::Result<ReadOutcome>;

    /// Write the whole buffer, blocking until the channel has accepted it.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
}
