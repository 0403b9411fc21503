//! Protocol engine: CRC, frame codec, and the two session roles.

pub mod crc;
pub mod frame;

pub(crate) mod receiver;
pub(crate) mod sender;

#[cfg(test)]
pub(crate) mod testutil;
