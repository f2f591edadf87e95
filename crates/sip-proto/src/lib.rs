//! SIP packet layer.
//!
//! A SIP packet is a fixed five-byte prefix, an optional payload and a
//! trailing CRC-16/CCITT:
//!
//! ```text
//! offset  size  field
//! 0       2     length field L (big-endian): header + payload, CRC excluded
//! 2       1     worker id
//! 3       1     counter
//! 4       1     type
//! 5       L-5   payload (may be empty)
//! L       2     CRC-16/CCITT over bytes [0 .. L) (big-endian)
//! ```
//!
//! Total wire size is `L + 2`; the smallest packet (empty payload) is seven
//! bytes with `L = 5`. [`PacketWriter`] builds and finalises packets in a
//! caller-provided buffer, [`PacketReader`] validates and exposes received
//! ones.

pub mod packet;
pub mod params;

pub use packet::{PacketError, PacketReader, PacketWriter};
