//! Byte stream contract.
//!
//! The minimal duplex-link interface the framed transport builds on. Real
//! backends (UART drivers, sockets) and test stubs implement these two
//! traits; everything above them is backend-agnostic.

use std::time::Duration;

use thiserror::Error;

/// Permanent failure of a byte stream.
///
/// Timeouts are not errors at this level: a read that yields no byte in
/// time returns `Ok(0)`.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The peer or driver closed the stream.
    #[error("byte stream closed")]
    Closed,

    /// The underlying device failed.
    #[error("byte stream I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiving half of a byte stream.
pub trait SerialRx {
    /// Reads up to `dst.len()` bytes, waiting at most `timeout`.
    ///
    /// Returns the number of bytes read; `0` means the timeout passed
    /// without data. Errors are reserved for permanent failures.
    fn read(&mut self, dst: &mut [u8], timeout: Duration) -> Result<usize, StreamError>;
}

/// Transmitting half of a byte stream.
pub trait SerialTx {
    /// Writes bytes from `src`, waiting at most `timeout`.
    ///
    /// Must attempt to fully write; returns the number of bytes accepted.
    fn write(&mut self, src: &[u8], timeout: Duration) -> Result<usize, StreamError>;
}
