//! Framed transport over raw byte streams.
//!
//! Glue between a framing codec and a duplex byte link (UART, socket,
//! test stub). The TX half serialises whole frames under a mutex; the RX
//! half polls the stream byte by byte into a buffered decoder, bounded by a
//! total timeout. The two halves are independent types so each side of a
//! link borrows exactly what it needs.

pub mod frame_transport;
pub mod serial;

pub use frame_transport::{FrameTransport, FrameTransportRx, FrameTransportTx, TransportError};
pub use serial::{SerialRx, SerialTx, StreamError};
