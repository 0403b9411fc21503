//! Error types for xmlink.

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

/// Result type for xmlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for xmlink operations.
///
/// Only CRC mismatches are recovered inside a session (the receiver answers
/// NAK and waits for the retransmission); every variant here ends the
/// session.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte channel reported a transport error on read or write.
    #[error("channel I/O error: {0}")]
    Channel(#[from] io::Error),

    /// Serial port open or configuration failed.
    #[cfg(feature = "native")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The local cancel predicate requested an abort; CAN was emitted.
    #[error("transfer cancelled")]
    Cancelled,

    /// The peer never answered the initial handshake.
    #[error("no answer to handshake after {0} polls")]
    IndicateTimeout(u32),

    /// The peer went silent in the middle of a transfer.
    #[error("peer silent for {0} polls")]
    XferTimeout(u32),

    /// A frame's packet number and its complement disagree.
    #[error("sequence check failed: seq {seq:#04x}, complement {complement:#04x}")]
    SeqCheckFailed {
        /// Packet number as received.
        seq: u8,
        /// Complement byte as received.
        complement: u8,
    },

    /// The peer cancelled the session with CAN.
    #[error("transfer cancelled by peer")]
    PeerCancelled,

    /// The block source could not be loaded before transmission.
    #[error("source error: {0}")]
    Source(#[source] io::Error),

    /// The received sequence could not be flushed to the sink.
    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    /// A received block could not be buffered.
    #[error("block allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// The peer violated the protocol in a way NAK cannot repair.
    #[error("protocol error: {0}")]
    Protocol(String),
}
