//! Transmit side of an XMODEM session.
//!
//! The sender stages the whole block sequence up front, then alternates
//! between single-byte polls and frame writes: wait for the receiver's `C`,
//! push one frame, wait for the verdict. Only an ACK moves the cursor and
//! the packet number forward; a NAK (or a late `C`) replays the current
//! frame unchanged. After the last block, EOT is sent and its ACK ends the
//! session.

use std::thread;

use log::{debug, trace};

use crate::CancelContext;
use crate::block::{BlockSequence, BlockSize};
use crate::channel::{ByteChannel, ReadOutcome};
use crate::error::{Error, Result};
use crate::protocol::frame::{self, control};
use crate::transfer::TransferConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Wait,
    DataXmt,
    EotXmt,
    Success,
}

/// What the sender last put on the wire; disambiguates replies in `Wait`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Previous {
    Initial,
    DataXmt,
    EotXmt,
}

pub(crate) struct Sender<'a, C: ByteChannel, F: FnMut(usize, usize)> {
    channel: &'a mut C,
    blocks: BlockSequence,
    block_size: BlockSize,
    config: &'a TransferConfig,
    cancel: &'a CancelContext,
    progress: F,
    seq: u8,
    acked: usize,
    indicate_retries: u32,
    xfer_retries: u32,
    previous: Previous,
}

impl<'a, C: ByteChannel, F: FnMut(usize, usize)> Sender<'a, C, F> {
    pub(crate) fn new(
        channel: &'a mut C,
        blocks: BlockSequence,
        block_size: BlockSize,
        config: &'a TransferConfig,
        cancel: &'a CancelContext,
        progress: F,
    ) -> Self {
        Self {
            channel,
            blocks,
            block_size,
            config,
            cancel,
            progress,
            seq: 0,
            acked: 0,
            indicate_retries: config.indicate_retries,
            xfer_retries: config.xfer_retries,
            previous: Previous::Initial,
        }
    }

    /// Drive the session to completion. Returns the padded byte count that
    /// was acknowledged by the peer.
    pub(crate) fn run(mut self) -> Result<usize> {
        let mut state = State::Wait;
        loop {
            state = match state {
                State::Wait => self.wait()?,
                State::DataXmt => self.data_xmt()?,
                State::EotXmt => self.eot_xmt()?,
                State::Success => {
                    debug!("transmit complete: {} block(s)", self.blocks.len());
                    return Ok(self.blocks.byte_len());
                }
            };
        }
    }

    fn wait(&mut self) -> Result<State> {
        if self.cancel.is_cancelled() {
            return Err(self.can_xmt(Error::Cancelled));
        }
        match self.channel.read_byte().map_err(Error::Channel)? {
            ReadOutcome::Empty => {
                self.empty_poll()?;
                Ok(State::Wait)
            }
            ReadOutcome::Byte(control::CRC_REQ) => match self.previous {
                Previous::Initial => {
                    trace!("transfer request received");
                    if self.blocks.start() {
                        self.seq = 1;
                        Ok(State::DataXmt)
                    } else {
                        // Nothing staged: an empty source ends immediately.
                        Ok(State::EotXmt)
                    }
                }
                // A poll that arrived late; replay the staged frame.
                Previous::DataXmt => Ok(State::DataXmt),
                Previous::EotXmt => Ok(State::Wait),
            },
            ReadOutcome::Byte(control::ACK) => match self.previous {
                Previous::DataXmt => {
                    self.seq = self.seq.wrapping_add(1);
                    self.acked += 1;
                    let done = self.acked * self.block_size.bytes();
                    (self.progress)(done, self.blocks.byte_len());
                    if self.blocks.advance() {
                        Ok(State::DataXmt)
                    } else {
                        Ok(State::EotXmt)
                    }
                }
                Previous::EotXmt => Ok(State::Success),
                Previous::Initial => Ok(State::Wait),
            },
            ReadOutcome::Byte(control::NAK) => {
                debug!("NAK received, resending block {}", self.seq);
                Ok(State::DataXmt)
            }
            ReadOutcome::Byte(control::CAN) => Err(Error::PeerCancelled),
            ReadOutcome::Byte(other) => {
                trace!("ignoring unexpected byte {other:#04x}");
                Ok(State::Wait)
            }
        }
    }

    fn empty_poll(&mut self) -> Result<()> {
        match self.previous {
            Previous::Initial => {
                self.indicate_retries = self.indicate_retries.saturating_sub(1);
                if self.indicate_retries == 0 {
                    return Err(Error::IndicateTimeout(self.config.indicate_retries));
                }
                thread::sleep(self.config.indicate_timeout);
            }
            Previous::DataXmt | Previous::EotXmt => {
                self.xfer_retries = self.xfer_retries.saturating_sub(1);
                if self.xfer_retries == 0 {
                    return Err(Error::XferTimeout(self.config.xfer_retries));
                }
                thread::sleep(self.config.xfer_timeout);
            }
        }
        Ok(())
    }

    fn data_xmt(&mut self) -> Result<State> {
        let Some(block) = self.blocks.current() else {
            return Err(Error::Protocol(
                "no block staged for transmission".into(),
            ));
        };
        let frame = frame::encode(self.block_size, self.seq, block);
        debug!("sending block {} ({} bytes)", self.seq, block.len());
        self.channel.write_all(&frame).map_err(Error::Channel)?;
        self.previous = Previous::DataXmt;
        self.xfer_retries = self.config.xfer_retries;
        Ok(State::Wait)
    }

    fn eot_xmt(&mut self) -> Result<State> {
        debug!("sending EOT");
        self.channel
            .write_all(&[control::EOT])
            .map_err(Error::Channel)?;
        self.previous = Previous::EotXmt;
        Ok(State::Wait)
    }

    fn can_xmt(&mut self, cause: Error) -> Error {
        let _ = self.channel.write_all(&[control::CAN]);
        cause
    }
}
