//! Frame-level transmit and receive over a byte stream.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use sip_codec::{BufferedFrameDecoder, CodecError, FrameEncoder};
use sip_time::{Clock, FOREVER};

use crate::serial::{SerialRx, SerialTx};
use thiserror::Error;

/// Errors of the framed transport.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// A frame does not fit its scratch or accumulation buffer.
    #[error("frame buffer too small")]
    Buffer,

    /// The framing layer rejected the received bytes.
    #[error("frame decoding failed")]
    Decoding,

    /// The operation did not complete within its time budget.
    #[error("frame transport timed out")]
    Timeout,

    /// The underlying byte stream reported a permanent failure. The
    /// transport is unusable until the stream is recreated.
    #[error("byte stream stopped")]
    StreamStopped,
}

impl From<CodecError> for TransportError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Buffer => Self::Buffer,
            CodecError::Decoding => Self::Decoding,
        }
    }
}

struct TxState<S, E> {
    serial: S,
    encoder: E,
    scratch: Box<[u8]>,
}

/// Transmitting half: encodes one payload per frame and writes it out.
///
/// Concurrent transmits serialise on an internal mutex, held for the
/// duration of one frame's encode and stream write, so frames never
/// interleave on the wire.
pub struct FrameTransportTx<S: SerialTx, E: FrameEncoder> {
    state: Mutex<TxState<S, E>>,
}

impl<S: SerialTx, E: FrameEncoder> FrameTransportTx<S, E> {
    /// Creates the TX half with an owned scratch buffer of `scratch_size`
    /// bytes. The scratch must hold the worst-case encoded frame.
    pub fn new(serial: S, encoder: E, scratch_size: usize) -> Self {
        Self {
            state: Mutex::new(TxState {
                serial,
                encoder,
                scratch: vec![0; scratch_size].into_boxed_slice(),
            }),
        }
    }

    /// Encodes `payload` into one frame and writes it fully to the stream.
    ///
    /// Returns the number of bytes put on the wire, framing overhead
    /// included.
    pub fn transmit(&self, payload: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let TxState { serial, encoder, scratch } = &mut *state;

        let encoded = encoder.encode(payload, scratch)?;

        let mut written = 0;
        while written < encoded.len() {
            match serial.write(&encoded[written..], FOREVER) {
                Ok(0) | Err(_) => return Err(TransportError::StreamStopped),
                Ok(count) => written += count,
            }
        }
        tracing::trace!(payload_len = payload.len(), wire_len = written, "frame transmitted");
        Ok(written)
    }
}

/// Receiving half: polls the stream byte by byte into a buffered decoder.
///
/// Single-threaded by design — the decoder state must not be shared.
/// Callers needing concurrent receivers own separate transports.
pub struct FrameTransportRx<C: Clock, S: SerialRx, D: BufferedFrameDecoder> {
    clock: C,
    serial: S,
    decoder: D,
    clear_on_timeout: bool,
    serial_read_timeout: Duration,
    wait_for_data_sleep_time: Duration,
}

impl<C: Clock, S: SerialRx, D: BufferedFrameDecoder> FrameTransportRx<C, S, D> {
    /// Default cap on a single blocking stream read.
    pub const DEFAULT_SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(10);

    /// Default backoff while the stream is idle.
    pub const DEFAULT_WAIT_FOR_DATA_SLEEP_TIME: Duration = Duration::from_millis(10);

    /// Creates the RX half with the default timing parameters and
    /// clear-on-timeout enabled.
    pub fn new(clock: C, serial: S, decoder: D) -> Self {
        Self {
            clock,
            serial,
            decoder,
            clear_on_timeout: true,
            serial_read_timeout: Self::DEFAULT_SERIAL_READ_TIMEOUT,
            wait_for_data_sleep_time: Self::DEFAULT_WAIT_FOR_DATA_SLEEP_TIME,
        }
    }

    /// Whether an overall timeout also resets the decoder state.
    #[must_use]
    pub fn with_clear_on_timeout(mut self, clear: bool) -> Self {
        self.clear_on_timeout = clear;
        self
    }

    /// Caps a single blocking stream read.
    #[must_use]
    pub fn with_serial_read_timeout(mut self, timeout: Duration) -> Self {
        self.serial_read_timeout = timeout;
        self
    }

    /// Sets the idle backoff between polls.
    #[must_use]
    pub fn with_wait_for_data_sleep_time(mut self, sleep: Duration) -> Self {
        self.wait_for_data_sleep_time = sleep;
        self
    }

    /// Receives one frame into `out`, waiting at most `timeout` overall.
    ///
    /// A zero `timeout` is non-blocking: already-buffered stream bytes are
    /// still consumed, but the call returns [`TransportError::Timeout`]
    /// without sleeping once the stream runs dry.
    pub fn receive<'a>(
        &mut self,
        out: &'a mut [u8],
        timeout: Duration,
    ) -> Result<&'a [u8], TransportError> {
        let start = self.clock.now();
        let non_blocking = timeout.is_zero();

        let outcome = loop {
            let elapsed = self.clock.now().saturating_sub(start);
            let remaining = timeout.saturating_sub(elapsed);
            if !non_blocking && remaining.is_zero() {
                break Err(TransportError::Timeout);
            }

            let mut byte = [0_u8; 1];
            let bounded = remaining.min(self.serial_read_timeout);
            let count = match self.serial.read(&mut byte, bounded) {
                Ok(count) => count,
                Err(error) => {
                    tracing::debug!(%error, "byte stream stopped");
                    break Err(TransportError::StreamStopped);
                }
            };

            if count == 0 {
                // nothing received, the stream read timed out
                if non_blocking {
                    return Err(TransportError::Timeout);
                }
                self.clock.sleep(self.wait_for_data_sleep_time);
                continue;
            }

            match self.decoder.push_byte(byte[0], &mut *out) {
                Ok(Some(frame)) => break Ok(frame.len()),
                Ok(None) => {}
                Err(error) => {
                    let elapsed = self.clock.now().saturating_sub(start);
                    if !non_blocking && timeout.saturating_sub(elapsed).is_zero() {
                        break Err(TransportError::Timeout);
                    }
                    break Err(error.into());
                }
            }
        };

        match outcome {
            Ok(len) => {
                tracing::trace!(frame_len = len, "frame received");
                Ok(&out[..len])
            }
            Err(TransportError::Timeout) => {
                if self.clear_on_timeout {
                    self.decoder.reset();
                }
                Err(TransportError::Timeout)
            }
            Err(error) => {
                self.decoder.reset();
                Err(error)
            }
        }
    }
}

/// Both halves of a framed transport over one duplex stream.
pub struct FrameTransport<C, R, T, E, D>
where
    C: Clock,
    R: SerialRx,
    T: SerialTx,
    E: FrameEncoder,
    D: BufferedFrameDecoder,
{
    /// Transmitting half.
    pub tx: FrameTransportTx<T, E>,
    /// Receiving half.
    pub rx: FrameTransportRx<C, R, D>,
}

impl<C, R, T, E, D> FrameTransport<C, R, T, E, D>
where
    C: Clock,
    R: SerialRx,
    T: SerialTx,
    E: FrameEncoder,
    D: BufferedFrameDecoder,
{
    /// Combines the split halves of one duplex stream.
    pub fn new(clock: C, rx_serial: R, tx_serial: T, encoder: E, decoder: D, scratch_size: usize) -> Self {
        Self {
            tx: FrameTransportTx::new(tx_serial, encoder, scratch_size),
            rx: FrameTransportRx::new(clock, rx_serial, decoder),
        }
    }

    /// See [`FrameTransportTx::transmit`].
    pub fn transmit(&self, payload: &[u8]) -> Result<usize, TransportError> {
        self.tx.transmit(payload)
    }

    /// See [`FrameTransportRx::receive`].
    pub fn receive<'a>(
        &mut self,
        out: &'a mut [u8],
        timeout: Duration,
    ) -> Result<&'a [u8], TransportError> {
        self.rx.receive(out, timeout)
    }

    /// Splits into the independent halves.
    #[must_use]
    pub fn split(self) -> (FrameTransportTx<T, E>, FrameTransportRx<C, R, D>) {
        (self.tx, self.rx)
    }
}
