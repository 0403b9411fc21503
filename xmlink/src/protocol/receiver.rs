//! Receive side of an XMODEM session.
//!
//! The receiver opens the session by polling `C` at the peer, then
//! assembles each frame one byte at a time: header, packet number and
//! complement, payload, CRC. A bad CRC is answered with NAK and the frame
//! is replayed by the peer; a bad packet-number pair cannot be repaired and
//! cancels the session. Accepted blocks are staged in memory and handed to
//! the caller only once EOT has been acknowledged.

use std::thread;

use log::{debug, trace};

use crate::CancelContext;
use crate::block::{BlockSequence, BlockSize};
use crate::channel::{ByteChannel, ReadOutcome};
use crate::error::{Error, Result};
use crate::protocol::crc::crc16_ccitt;
use crate::protocol::frame::{self, control};
use crate::transfer::TransferConfig;
use byteorder::{BigEndian, ByteOrder};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Indicate,
    Wait,
    HdrRcv,
    PktNumRcv,
    DataRcv,
    AckXmt,
    NakXmt,
    Success,
}

/// What the receiver last did; steers `Wait` retries and the ACK successor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Previous {
    Indicate,
    DataRcv,
    AckXmt,
    NakXmt,
    WaitTerm,
    WaitCanc,
}

pub(crate) struct Receiver<'a, C: ByteChannel, F: FnMut(usize)> {
    channel: &'a mut C,
    config: &'a TransferConfig,
    cancel: &'a CancelContext,
    progress: F,
    blocks: BlockSequence,
    payload: Vec<u8>,
    mode: Option<BlockSize>,
    seq: u8,
    seq_comp: u8,
    last_accepted: u8,
    indicate_retries: u32,
    xfer_retries: u32,
    previous: Previous,
}

impl<'a, C: ByteChannel, F: FnMut(usize)> Receiver<'a, C, F> {
    pub(crate) fn new(
        channel: &'a mut C,
        config: &'a TransferConfig,
        cancel: &'a CancelContext,
        progress: F,
    ) -> Self {
        Self {
            channel,
            config,
            cancel,
            progress,
            blocks: BlockSequence::new(),
            payload: Vec::new(),
            mode: None,
            seq: 0,
            seq_comp: 0,
            // Sentinel: a valid first frame always carries seq 1.
            last_accepted: 0xFF,
            indicate_retries: config.indicate_retries,
            xfer_retries: config.xfer_retries,
            previous: Previous::Indicate,
        }
    }

    /// Drive the session to completion and hand back the staged sequence.
    pub(crate) fn run(mut self) -> Result<BlockSequence> {
        let mut state = State::Indicate;
        loop {
            state = match state {
                State::Indicate => self.indicate()?,
                State::Wait => self.wait()?,
                State::HdrRcv => self.hdr_rcv()?,
                State::PktNumRcv => self.pkt_num_rcv()?,
                State::DataRcv => self.data_rcv()?,
                State::AckXmt => self.ack_xmt()?,
                State::NakXmt => self.nak_xmt()?,
                State::Success => {
                    debug!("receive complete: {} block(s)", self.blocks.len());
                    return Ok(self.blocks);
                }
            };
        }
    }

    fn indicate(&mut self) -> Result<State> {
        trace!("requesting transfer");
        self.channel
            .write_all(&[control::CRC_REQ])
            .map_err(Error::Channel)?;
        self.previous = Previous::Indicate;
        Ok(State::Wait)
    }

    fn wait(&mut self) -> Result<State> {
        if self.cancel.is_cancelled() {
            return Err(self.can_xmt(Error::Cancelled));
        }
        match self.channel.read_byte().map_err(Error::Channel)? {
            ReadOutcome::Empty => self.empty_poll(),
            ReadOutcome::Byte(b) => {
                self.xfer_retries = self.config.xfer_retries;
                match b {
                    control::SOH => self.frame_start(BlockSize::Standard),
                    control::STX => self.frame_start(BlockSize::OneK),
                    control::EOT => {
                        debug!("EOT received");
                        self.previous = Previous::WaitTerm;
                        Ok(State::AckXmt)
                    }
                    control::CAN => {
                        debug!("CAN received");
                        self.previous = Previous::WaitCanc;
                        Ok(State::AckXmt)
                    }
                    other => {
                        trace!("ignoring unexpected byte {other:#04x}");
                        Ok(State::Wait)
                    }
                }
            }
        }
    }

    fn empty_poll(&mut self) -> Result<State> {
        match self.previous {
            Previous::Indicate => {
                self.indicate_retries = self.indicate_retries.saturating_sub(1);
                if self.indicate_retries == 0 {
                    return Err(Error::IndicateTimeout(self.config.indicate_retries));
                }
                if self.indicate_retries % self.config.indicate_interval.max(1) == 0 {
                    return Ok(State::Indicate);
                }
                thread::sleep(self.config.indicate_timeout);
                Ok(State::Wait)
            }
            Previous::AckXmt | Previous::NakXmt => {
                self.xfer_retries = self.xfer_retries.saturating_sub(1);
                if self.xfer_retries == 0 {
                    return Err(Error::XferTimeout(self.config.xfer_retries));
                }
                thread::sleep(self.config.xfer_timeout);
                Ok(State::Wait)
            }
            _ => Ok(State::Wait),
        }
    }

    fn frame_start(&mut self, size: BlockSize) -> Result<State> {
        match self.mode {
            None => {
                debug!("mode locked to {}-byte blocks", size.bytes());
                self.mode = Some(size);
            }
            Some(locked) if locked != size => {
                return Err(self.can_xmt(Error::Protocol(format!(
                    "block size changed mid-session ({} to {})",
                    locked.bytes(),
                    size.bytes()
                ))));
            }
            Some(_) => {}
        }
        Ok(State::HdrRcv)
    }

    fn hdr_rcv(&mut self) -> Result<State> {
        self.seq = self.read_frame_byte()?;
        self.seq_comp = self.read_frame_byte()?;
        Ok(State::PktNumRcv)
    }

    fn pkt_num_rcv(&mut self) -> Result<State> {
        let size = match self.mode {
            Some(m) => m.bytes(),
            None => return Err(Error::Protocol("payload read before header".into())),
        };
        self.payload.clear();
        self.payload.try_reserve(size)?;
        while self.payload.len() < size {
            let b = self.read_frame_byte()?;
            self.payload.push(b);
        }
        Ok(State::DataRcv)
    }

    fn data_rcv(&mut self) -> Result<State> {
        let crc_buf = [self.read_frame_byte()?, self.read_frame_byte()?];
        let declared = BigEndian::read_u16(&crc_buf);
        let computed = crc16_ccitt(&self.payload);
        if declared != computed {
            debug!(
                "CRC mismatch on block {}: declared {declared:#06x}, computed {computed:#06x}",
                self.seq
            );
            return Ok(State::NakXmt);
        }
        if !frame::seq_pair_valid(self.seq, self.seq_comp) {
            return Err(self.can_xmt(Error::SeqCheckFailed {
                seq: self.seq,
                complement: self.seq_comp,
            }));
        }
        if self.seq == self.last_accepted {
            debug!("duplicate block {} dropped", self.seq);
        } else {
            self.blocks.try_push(&self.payload)?;
            self.last_accepted = self.seq;
            (self.progress)(self.blocks.byte_len());
        }
        self.previous = Previous::DataRcv;
        Ok(State::AckXmt)
    }

    fn ack_xmt(&mut self) -> Result<State> {
        self.channel
            .write_all(&[control::ACK])
            .map_err(Error::Channel)?;
        match self.previous {
            Previous::WaitTerm => Ok(State::Success),
            Previous::WaitCanc => Err(Error::PeerCancelled),
            _ => {
                self.previous = Previous::AckXmt;
                Ok(State::Wait)
            }
        }
    }

    fn nak_xmt(&mut self) -> Result<State> {
        self.channel
            .write_all(&[control::NAK])
            .map_err(Error::Channel)?;
        self.previous = Previous::NakXmt;
        Ok(State::Wait)
    }

    fn can_xmt(&mut self, cause: Error) -> Error {
        let _ = self.channel.write_all(&[control::CAN]);
        cause
    }

    /// One payload/header byte with the per-byte retry discipline: each
    /// empty poll burns one retry, each received byte refills the budget.
    fn read_frame_byte(&mut self) -> Result<u8> {
        loop {
            match self.channel.read_byte().map_err(Error::Channel)? {
                ReadOutcome::Byte(b) => {
                    self.xfer_retries = self.config.xfer_retries;
                    return Ok(b);
                }
                ReadOutcome::Empty => {
                    self.xfer_retries = self.xfer_retries.saturating_sub(1);
                    if self.xfer_retries == 0 {
                        return Err(Error::XferTimeout(self.config.xfer_retries));
                    }
                    thread::sleep(self.config.xfer_timeout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testutil::{ScriptChannel, test_config};

    fn run_receiver(
        channel: &mut ScriptChannel,
        config: &TransferConfig,
    ) -> Result<BlockSequence> {
        let cancel = CancelContext::none();
        Receiver::new(channel, config, &cancel, |_| {}).run()
    }

    fn script_with_frames(frames: &[Vec<u8>], tail: &[u8]) -> Vec<u8> {
        let mut script = Vec::new();
        for f in frames {
            script.extend_from_slice(f);
        }
        script.extend_from_slice(tail);
        script
    }

    #[test]
    fn single_frame_then_eot() {
        let config = test_config();
        let payload = [0x41u8; 128];
        let script = script_with_frames(
            &[frame::encode(BlockSize::Standard, 1, &payload)],
            &[control::EOT],
        );
        let mut channel = ScriptChannel::new(&script);

        let blocks = run_receiver(&mut channel, &config).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.blocks().next().unwrap(), &payload[..]);
        assert_eq!(
            channel.written,
            vec![control::CRC_REQ, control::ACK, control::ACK]
        );
    }

    #[test]
    fn duplicate_frame_acked_but_dropped() {
        let config = test_config();
        let payload = [0x5Au8; 128];
        let frame = frame::encode(BlockSize::Standard, 1, &payload);
        let script = script_with_frames(&[frame.clone(), frame], &[control::EOT]);
        let mut channel = ScriptChannel::new(&script);

        let blocks = run_receiver(&mut channel, &config).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            channel.written,
            vec![control::CRC_REQ, control::ACK, control::ACK, control::ACK]
        );
    }

    #[test]
    fn crc_mismatch_naks_then_accepts_retransmission() {
        let config = test_config();
        let payload = [0x13u8; 128];
        let good = frame::encode(BlockSize::Standard, 1, &payload);
        let mut bad = good.clone();
        bad[10] ^= 0x01;
        let script = script_with_frames(&[bad, good], &[control::EOT]);
        let mut channel = ScriptChannel::new(&script);

        let blocks = run_receiver(&mut channel, &config).unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.blocks().next().unwrap(), &payload[..]);
        assert_eq!(
            channel.written,
            vec![control::CRC_REQ, control::NAK, control::ACK, control::ACK]
        );
    }

    #[test]
    fn bad_complement_cancels_session() {
        let config = test_config();
        let mut frame = frame::encode(BlockSize::Standard, 1, &[0u8; 128]);
        frame[2] = 0x00; // complement of 1 must be 0xFE
        let mut channel = ScriptChannel::new(&frame);

        let err = run_receiver(&mut channel, &config).unwrap_err();

        assert!(matches!(
            err,
            Error::SeqCheckFailed {
                seq: 1,
                complement: 0
            }
        ));
        assert_eq!(channel.written, vec![control::CRC_REQ, control::CAN]);
    }

    #[test]
    fn mid_session_block_size_change_cancels() {
        let config = test_config();
        let first = frame::encode(BlockSize::Standard, 1, &[0u8; 128]);
        let second = frame::encode(BlockSize::OneK, 2, &[0u8; 1024]);
        let script = script_with_frames(&[first, second], &[]);
        let mut channel = ScriptChannel::new(&script);

        let err = run_receiver(&mut channel, &config).unwrap_err();

        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(
            channel.written,
            vec![control::CRC_REQ, control::ACK, control::CAN]
        );
    }

    #[test]
    fn peer_can_is_acked_then_fails() {
        let config = test_config();
        let mut channel = ScriptChannel::new(&[control::CAN]);

        let err = run_receiver(&mut channel, &config).unwrap_err();

        assert!(matches!(err, Error::PeerCancelled));
        assert_eq!(channel.written, vec![control::CRC_REQ, control::ACK]);
    }

    #[test]
    fn handshake_reemits_request_every_interval() {
        let mut config = test_config();
        config.indicate_retries = 6;
        config.indicate_interval = 2;
        let mut channel = ScriptChannel::new(&[]);

        let err = run_receiver(&mut channel, &config).unwrap_err();

        // The sixth empty poll exhausts the budget and fails the session.
        assert!(matches!(err, Error::IndicateTimeout(6)));
        // Initial request plus re-emissions at retry counts 4 and 2.
        let requests = channel
            .written
            .iter()
            .filter(|&&b| b == control::CRC_REQ)
            .count();
        assert_eq!(requests, 3);
        assert_eq!(channel.written.len(), 3);
    }

    #[test]
    fn silence_mid_frame_times_out() {
        let config = test_config();
        // Header only; the packet number never arrives.
        let mut channel = ScriptChannel::new(&[control::SOH]);

        let err = run_receiver(&mut channel, &config).unwrap_err();

        assert!(matches!(err, Error::XferTimeout(_)));
    }

    #[test]
    fn one_k_frames_are_accepted() {
        let config = test_config();
        let payload = [0x77u8; 1024];
        let script = script_with_frames(
            &[frame::encode(BlockSize::OneK, 1, &payload)],
            &[control::EOT],
        );
        let mut channel = ScriptChannel::new(&script);

        let blocks = run_receiver(&mut channel, &config).unwrap();

        assert_eq!(blocks.byte_len(), 1024);
    }

    #[test]
    fn local_cancel_emits_can() {
        let config = test_config();
        let cancel = CancelContext::new(|| true);
        let mut channel = ScriptChannel::new(&[]);

        let err = Receiver::new(&mut channel, &config, &cancel, |_| {})
            .run()
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        // The request from Indicate, then the cancel.
        assert_eq!(channel.written, vec![control::CRC_REQ, control::CAN]);
    }

    #[test]
    fn progress_reports_accepted_bytes() {
        let config = test_config();
        let cancel = CancelContext::none();
        let script = script_with_frames(
            &[
                frame::encode(BlockSize::Standard, 1, &[1u8; 128]),
                frame::encode(BlockSize::Standard, 2, &[2u8; 128]),
            ],
            &[control::EOT],
        );
        let mut channel = ScriptChannel::new(&script);
        let mut seen = Vec::new();

        Receiver::new(&mut channel, &config, &cancel, |bytes| seen.push(bytes))
            .run()
            .unwrap();

        assert_eq!(seen, vec![128, 256]);
    }
}
