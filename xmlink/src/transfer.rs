//! Session orchestration.
//!
//! [`XmodemTransfer`] binds a byte channel, a block source or sink, and a
//! cancellation context, then drives one protocol role until it reaches
//! success or failure. Exactly one role runs per session on a given
//! channel.

use std::io::{Read, Write};
use std::time::Duration;

use log::{debug, warn};

use crate::CancelContext;
use crate::block::{BlockSequence, BlockSize};
use crate::channel::ByteChannel;
use crate::error::{Error, Result};
use crate::protocol::receiver::Receiver;
use crate::protocol::sender::Sender;

/// Tunables for one transfer session.
///
/// The defaults reproduce the classic timing: the handshake is polled every
/// 100 ms for 60 polls, and a session that has exchanged data tolerates 100
/// empty 10 ms polls before giving up.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Pause between empty polls while waiting for the handshake.
    pub indicate_timeout: Duration,
    /// Empty polls tolerated while waiting for the handshake.
    pub indicate_retries: u32,
    /// Receiver only: re-emit the transfer request every this many empty
    /// polls.
    pub indicate_interval: u32,
    /// Pause between empty polls once a transfer is underway.
    pub xfer_timeout: Duration,
    /// Empty polls tolerated mid-transfer before giving up.
    pub xfer_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            indicate_timeout: Duration::from_millis(100),
            indicate_retries: 60,
            indicate_interval: 10,
            xfer_timeout: Duration::from_millis(10),
            xfer_retries: 100,
        }
    }
}

/// One XMODEM-CRC / XMODEM-1K session over a byte channel.
///
/// ```no_run
/// use std::fs::File;
/// use xmlink::{BlockSize, SerialChannel, XmodemTransfer};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut channel = SerialChannel::open_simple("/dev/ttyUSB0", 115200)?;
///     let mut source = File::open("firmware.bin")?;
///
///     let sent = XmodemTransfer::new(&mut channel).transmit(
///         &mut source,
///         BlockSize::Standard,
///         |done, total| println!("{done}/{total}"),
///     )?;
///     println!("sent {sent} byte(s)");
///     Ok(())
/// }
/// ```
pub struct XmodemTransfer<'a, C: ByteChannel> {
    channel: &'a mut C,
    config: TransferConfig,
    cancel: CancelContext,
}

impl<'a, C: ByteChannel> XmodemTransfer<'a, C> {
    /// Create a session on `channel` with default tunables and no
    /// cancellation.
    pub fn new(channel: &'a mut C) -> Self {
        Self {
            channel,
            config: TransferConfig::default(),
            cancel: CancelContext::none(),
        }
    }

    /// Replace the session tunables.
    #[must_use]
    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a cancellation context consulted at every wait.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelContext) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the sender role: stage `source` as padded blocks and hand them
    /// to the peer.
    ///
    /// `progress` is called with (acknowledged, total) padded byte counts
    /// after each acknowledged block. Returns the padded byte count on
    /// success.
    pub fn transmit<R, F>(
        &mut self,
        source: &mut R,
        block_size: BlockSize,
        progress: F,
    ) -> Result<usize>
    where
        R: Read,
        F: FnMut(usize, usize),
    {
        let blocks = BlockSequence::from_reader(source, block_size).map_err(Error::Source)?;
        debug!(
            "staged {} block(s) of {} bytes",
            blocks.len(),
            block_size.bytes()
        );
        Sender::new(
            &mut *self.channel,
            blocks,
            block_size,
            &self.config,
            &self.cancel,
            progress,
        )
        .run()
    }

    /// Run the receiver role: request blocks from the peer and write the
    /// reassembled sequence to `sink` once the session succeeds.
    ///
    /// `progress` is called with the received byte count after each
    /// accepted block. The final block is written verbatim: trailing pad
    /// bytes are kept (and reported with a warning), so the output length
    /// is always a multiple of the peer's block size.
    pub fn receive<W, F>(&mut self, sink: &mut W, progress: F) -> Result<usize>
    where
        W: Write,
        F: FnMut(usize),
    {
        let blocks = Receiver::new(&mut *self.channel, &self.config, &self.cancel, progress).run()?;
        let pad = blocks.trailing_pad_len();
        if pad > 0 {
            warn!("last block ends with {pad} pad byte(s); output keeps them");
        }
        let mut written = 0;
        for block in blocks.blocks() {
            sink.write_all(block).map_err(Error::Sink)?;
            written += block.len();
        }
        sink.flush().map_err(Error::Sink)?;
        Ok(written)
    }
}
