//! On-wire frame codec for XMODEM-CRC and XMODEM-1K.
//!
//! ```text
//! Frame format:
//! +---------+-----+------+------------------+--------+
//! | SOH/STX | SEQ | ~SEQ | DATA (128/1024)  | CRC16  |
//! +---------+-----+------+------------------+--------+
//! | 1       | 1   | 1    | 128 or 1024      | 2 (BE) |
//! +---------+-----+------+------------------+--------+
//! ```
//!
//! SOH announces a 128-byte payload, STX a 1024-byte one. Packet numbers
//! start at 1 and wrap through 255 to 0.

use byteorder::{BigEndian, ByteOrder};

use crate::block::BlockSize;
use crate::protocol::crc::crc16_ccitt;

/// Control bytes of the XMODEM wire protocol.
pub mod control {
    /// Start of Header: a 128-byte frame follows.
    pub const SOH: u8 = 0x01;
    /// Start of Text: a 1024-byte frame follows.
    pub const STX: u8 = 0x02;
    /// End of Transmission.
    pub const EOT: u8 = 0x04;
    /// Positive acknowledgement.
    pub const ACK: u8 = 0x06;
    /// Negative acknowledgement: resend the last frame.
    pub const NAK: u8 = 0x15;
    /// Cancel the session.
    pub const CAN: u8 = 0x18;
    /// Receiver's transfer request: "start, use CRC mode".
    pub const CRC_REQ: u8 = b'C';
    /// Payload padding for a final short block.
    pub const PAD: u8 = 0x1A;
}

/// Header byte announcing a frame of the given block size.
#[must_use]
pub const fn header_for(size: BlockSize) -> u8 {
    match size {
        BlockSize::Standard => control::SOH,
        BlockSize::OneK => control::STX,
    }
}

/// Block size announced by a header byte, if it is a data-frame header.
#[must_use]
pub const fn size_for_header(header: u8) -> Option<BlockSize> {
    match header {
        control::SOH => Some(BlockSize::Standard),
        control::STX => Some(BlockSize::OneK),
        _ => None,
    }
}

/// True when a packet number and its complement byte agree.
#[must_use]
pub fn seq_pair_valid(seq: u8, complement: u8) -> bool {
    seq.wrapping_add(complement) == 0xFF
}

/// Encode one data frame: header, packet number, complement, payload, CRC.
///
/// `payload` must already be padded to exactly `size.bytes()`.
#[must_use]
pub fn encode(size: BlockSize, seq: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert_eq!(payload.len(), size.bytes());
    let mut frame = Vec::with_capacity(3 + payload.len() + 2);
    frame.push(header_for(size));
    frame.push(seq);
    frame.push(!seq);
    frame.extend_from_slice(payload);
    let mut crc = [0u8; 2];
    BigEndian::write_u16(&mut crc, crc16_ccitt(payload));
    frame.extend_from_slice(&crc);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_standard_frame() {
        let payload = [0x41u8; 128];
        let frame = encode(BlockSize::Standard, 1, &payload);

        assert_eq!(frame.len(), 133);
        assert_eq!(frame[0], control::SOH);
        assert_eq!(frame[1], 1);
        assert_eq!(frame[2], 0xFE);
        assert_eq!(&frame[3..131], &payload[..]);
        // crc16_ccitt(128 x 0x41) == 0xA7D3, big-endian on the wire
        assert_eq!(frame[131], 0xA7);
        assert_eq!(frame[132], 0xD3);
    }

    #[test]
    fn encode_one_k_frame() {
        let payload = [0xAAu8; 1024];
        let frame = encode(BlockSize::OneK, 5, &payload);

        assert_eq!(frame.len(), 1029);
        assert_eq!(frame[0], control::STX);
        assert_eq!(frame[1], 5);
        assert_eq!(frame[2], 0xFA);
    }

    #[test]
    fn header_round_trip() {
        assert_eq!(size_for_header(control::SOH), Some(BlockSize::Standard));
        assert_eq!(size_for_header(control::STX), Some(BlockSize::OneK));
        assert_eq!(size_for_header(control::EOT), None);
        assert_eq!(header_for(BlockSize::OneK), control::STX);
    }

    #[test]
    fn seq_pair_checks() {
        assert!(seq_pair_valid(0, 0xFF));
        assert!(seq_pair_valid(1, 0xFE));
        assert!(seq_pair_valid(0xFF, 0));
        assert!(!seq_pair_valid(1, 0xFF));
    }
}
