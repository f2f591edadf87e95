//! Framing codec interfaces.
//!
//! A [`FrameEncoder`] turns one payload into one delimited frame; a
//! [`BufferedFrameDecoder`] is fed the raw stream byte by byte and yields a
//! payload whenever a complete frame has been seen. Both are object-safe so
//! transports can be composed with either codec at runtime.

use thiserror::Error;

/// Errors of the framing layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// An output or accumulation buffer cannot hold the data.
    #[error("frame buffer too small")]
    Buffer,

    /// The accumulated bytes do not form a valid frame.
    #[error("malformed frame")]
    Decoding,
}

/// Encodes one payload into one self-delimiting frame.
pub trait FrameEncoder {
    /// Encodes `payload` into `out` and returns the written prefix.
    ///
    /// # Errors
    ///
    /// [`CodecError::Buffer`] when `out` cannot hold the encoded frame.
    fn encode<'a>(&self, payload: &[u8], out: &'a mut [u8]) -> Result<&'a [u8], CodecError>;

    /// Worst-case encoded size for a payload of `payload_len` bytes.
    fn max_encoded_len(&self, payload_len: usize) -> usize;
}

/// Byte-fed frame decoder with internal accumulation.
///
/// Feed every received byte through [`push_byte`](Self::push_byte):
///
/// - `Ok(None)` — frame not complete yet, keep feeding,
/// - `Ok(Some(payload))` — a frame closed with this byte; the decoded
///   payload was written into the caller's buffer,
/// - `Err(_)` — the accumulated bytes are not a valid frame
///   ([`CodecError::Decoding`]) or a buffer limit was hit
///   ([`CodecError::Buffer`]). The caller decides whether to
///   [`reset`](Self::reset) and resynchronise.
///
/// Decoders are single-owner state machines; they are not meant to be shared
/// between threads.
pub trait BufferedFrameDecoder {
    /// Consumes one stream byte, writing a completed payload into `out`.
    fn push_byte<'a>(&mut self, byte: u8, out: &'a mut [u8]) -> Result<Option<&'a [u8]>, CodecError>;

    /// Drops all accumulated state.
    ///
    /// After a reset the next decode depends only on subsequently fed bytes.
    fn reset(&mut self);
}
