//! Shared helpers for the protocol unit tests.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::channel::{ByteChannel, ReadOutcome};
use crate::transfer::TransferConfig;

/// Channel fed from a fixed script of incoming bytes.
///
/// Reads pop the script one byte at a time and report `Empty` once it runs
/// dry; everything written is captured for assertions.
pub(crate) struct ScriptChannel {
    input: VecDeque<u8>,
    pub(crate) written: Vec<u8>,
}

impl ScriptChannel {
    pub(crate) fn new(script: &[u8]) -> Self {
        Self {
            input: script.iter().copied().collect(),
            written: Vec::new(),
        }
    }
}

impl ByteChannel for ScriptChannel {
    fn read_byte(&mut self) -> io::Result<ReadOutcome> {
        Ok(match self.input.pop_front() {
            Some(b) => ReadOutcome::Byte(b),
            None => ReadOutcome::Empty,
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(buf);
        Ok(())
    }
}

/// Config with sub-millisecond pauses so timeout paths finish fast.
pub(crate) fn test_config() -> TransferConfig {
    TransferConfig {
        indicate_timeout: Duration::from_micros(100),
        indicate_retries: 6,
        indicate_interval: 2,
        xfer_timeout: Duration::from_micros(100),
        xfer_retries: 4,
    }
}
