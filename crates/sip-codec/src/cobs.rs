//! Consistent-Overhead Byte Stuffing framing.
//!
//! Encoded frames contain no `0x00` byte; a trailing [`DELIMITER`]
//! terminates each frame. Overhead is one code byte per started run of 254
//! payload bytes.

use crate::frame::{BufferedFrameDecoder, CodecError, FrameEncoder};

/// Frame delimiter byte.
pub const DELIMITER: u8 = 0x00;

/// Longest run of payload bytes covered by one code byte.
const MAX_RUN: usize = 254;

/// Worst-case encoded size including the trailing delimiter.
#[must_use]
pub const fn max_encoded_len(payload_len: usize) -> usize {
    payload_len + payload_len.div_ceil(MAX_RUN) + 2
}

/// COBS encoder.
#[derive(Debug, Default)]
pub struct CobsEncoder;

impl FrameEncoder for CobsEncoder {
    fn encode<'a>(&self, payload: &[u8], out: &'a mut [u8]) -> Result<&'a [u8], CodecError> {
        // sized against the worst case up front; the actual encoding is
        // never larger
        if out.len() < max_encoded_len(payload.len()) {
            return Err(CodecError::Buffer);
        }

        let mut code_index = 0;
        let mut written = 1;
        let mut code = 1_u8;

        for &byte in payload {
            if byte == 0 {
                out[code_index] = code;
                code_index = written;
                written += 1;
                code = 1;
            } else {
                out[written] = byte;
                written += 1;
                code += 1;
                if usize::from(code) == MAX_RUN + 1 {
                    out[code_index] = code;
                    code_index = written;
                    written += 1;
                    code = 1;
                }
            }
        }

        out[code_index] = code;
        out[written] = DELIMITER;
        written += 1;
        Ok(&out[..written])
    }

    fn max_encoded_len(&self, payload_len: usize) -> usize {
        max_encoded_len(payload_len)
    }
}

/// Decodes one accumulated frame (delimiter already stripped) into `out`.
fn decode_frame(frame: &[u8], out: &mut [u8]) -> Result<usize, CodecError> {
    let mut written = 0;
    let mut index = 0;

    while index < frame.len() {
        let code = frame[index];
        if code == 0 {
            return Err(CodecError::Decoding);
        }
        index += 1;

        let run = usize::from(code) - 1;
        if index + run > frame.len() {
            return Err(CodecError::Decoding);
        }
        for &byte in &frame[index..index + run] {
            if byte == 0 {
                return Err(CodecError::Decoding);
            }
            if written >= out.len() {
                return Err(CodecError::Buffer);
            }
            out[written] = byte;
            written += 1;
        }
        index += run;

        if usize::from(code) <= MAX_RUN && index < frame.len() {
            if written >= out.len() {
                return Err(CodecError::Buffer);
            }
            out[written] = 0;
            written += 1;
        }
    }
    Ok(written)
}

/// Byte-fed COBS decoder.
///
/// Bytes accumulate until the delimiter; the whole buffered region is then
/// decoded at once. Stray delimiters on an idle line are ignored; garbage
/// preceding a delimiter surfaces as [`CodecError::Decoding`] and leaves the
/// decoder resynchronised.
#[derive(Debug)]
pub struct CobsDecoder {
    buffer: Box<[u8]>,
    len: usize,
}

impl CobsDecoder {
    /// Creates a decoder with an accumulation buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { buffer: vec![0; capacity].into_boxed_slice(), len: 0 }
    }
}

impl BufferedFrameDecoder for CobsDecoder {
    fn push_byte<'a>(&mut self, byte: u8, out: &'a mut [u8]) -> Result<Option<&'a [u8]>, CodecError> {
        if byte == DELIMITER {
            if self.len == 0 {
                // idle line, nothing buffered
                return Ok(None);
            }
            let decoded = decode_frame(&self.buffer[..self.len], out);
            self.reset();
            return match decoded {
                Ok(len) => Ok(Some(&out[..len])),
                Err(error) => Err(error),
            };
        }

        if self.len == self.buffer.len() {
            return Err(CodecError::Buffer);
        }
        self.buffer[self.len] = byte;
        self.len += 1;
        Ok(None)
    }

    fn reset(&mut self) {
        self.len = 0;
    }
}
