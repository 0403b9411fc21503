//! # xmlink
//!
//! XMODEM-CRC / XMODEM-1K file transfer over byte-granular channels.
//!
//! This crate implements both roles of the protocol as cooperative state
//! machines driven one byte at a time:
//!
//! - a **sender** that stages a byte source as padded fixed-size blocks and
//!   hands them to the peer frame by frame, and
//! - a **receiver** that requests the transfer, validates every frame
//!   (CRC-16/CCITT, packet-number complement, duplicate detection) and
//!   reassembles the blocks.
//!
//! The engine never blocks on a full frame: every read is a bounded
//! single-byte poll against a [`ByteChannel`], which keeps the retry and
//! timeout budgets ticking and lets sessions react to cancellation. A
//! serial port binding is provided behind the `native` feature (default);
//! any other transport works by implementing [`ByteChannel`].
//!
//! ## Cancellation model
//!
//! Long-running sessions can be cancelled through a [`CancelContext`]
//! consulted at every wait. The embedding application (e.g. the CLI on
//! Ctrl-C) signals interruption, and the active role emits a single CAN
//! byte before failing.
//!
//! ```ignore
//! use xmlink::{CancelContext, cancel_context_from_global};
//!
//! // Option 1: bridge the process-global interrupt flag (set on Ctrl-C).
//! let cancel = cancel_context_from_global();
//!
//! // Option 2: a custom checker; true means "abort now".
//! use std::sync::atomic::{AtomicBool, Ordering};
//! static STOP: AtomicBool = AtomicBool::new(false);
//! let cancel = CancelContext::new(|| STOP.load(Ordering::SeqCst));
//!
//! // Option 3: no cancellation.
//! let cancel = CancelContext::none();
//! ```
//!
//! ## Features
//!
//! - `native` (default): serial port support via the `serialport` crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod block;
pub mod channel;
pub mod error;
pub mod protocol;
pub mod transfer;

/// Global interrupt flag for CLI-to-library communication.
///
/// Set by the CLI when Ctrl-C is received, observed through
/// `cancel_context_from_global()` by running sessions.
static INTERRUPT_FLAG: AtomicBool = AtomicBool::new(false);

/// Explicit cancellation context for running sessions.
///
/// Passed through the call chain rather than read from a process global,
/// which keeps sessions composable and testable under fault injection.
/// The checker returns **true when cancellation has been requested**.
#[derive(Clone, Default)]
pub struct CancelContext {
    checker: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl CancelContext {
    /// Create a cancel context with the given checker function.
    #[must_use]
    pub fn new<F>(checker: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            checker: Some(Arc::new(checker)),
        }
    }

    /// Create a no-op cancel context (never cancelled).
    #[must_use]
    pub fn none() -> Self {
        Self { checker: None }
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.checker.as_ref().is_some_and(|c| c())
    }

    /// Check and return [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Create a [`CancelContext`] that observes the global interrupt flag.
#[must_use]
pub fn cancel_context_from_global() -> CancelContext {
    CancelContext::new(|| INTERRUPT_FLAG.load(Ordering::SeqCst))
}

/// Set the global interrupt flag (for the CLI's Ctrl-C handler).
pub fn set_interrupt_flag() {
    INTERRUPT_FLAG.store(true, Ordering::SeqCst);
}

/// Clear the global interrupt flag.
pub fn clear_interrupt_flag() {
    INTERRUPT_FLAG.store(false, Ordering::SeqCst);
}

/// Returns whether interruption was requested.
#[must_use]
pub fn is_interrupt_requested() -> bool {
    INTERRUPT_FLAG.load(Ordering::SeqCst)
}

// Re-exports for convenience
pub use {
    block::{BlockSequence, BlockSize},
    channel::{ByteChannel, ReadOutcome},
    error::{Error, Result},
    transfer::{TransferConfig, XmodemTransfer},
};

#[cfg(feature = "native")]
pub use channel::serial::{PortInfo, SerialChannel, SerialConfig, list_ports};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_context_none_never_cancels() {
        let cancel = CancelContext::none();
        assert!(!cancel.is_cancelled());
        assert!(cancel.check().is_ok());
    }

    #[test]
    fn cancel_context_checker_is_consulted() {
        let cancel = CancelContext::new(|| true);
        assert!(cancel.is_cancelled());
        assert!(matches!(cancel.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn interrupt_flag_round_trip() {
        clear_interrupt_flag();
        assert!(!is_interrupt_requested());
        assert!(!cancel_context_from_global().is_cancelled());

        set_interrupt_flag();
        assert!(is_interrupt_requested());
        assert!(cancel_context_from_global().is_cancelled());

        clear_interrupt_flag();
        assert!(!is_interrupt_requested());
    }
}
