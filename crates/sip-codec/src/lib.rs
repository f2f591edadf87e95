//! Byte-level codecs for the SIP support libraries.
//!
//! Contains the pieces that sit between structured packets and raw byte
//! streams:
//!
//! - endianness-explicit store/read cursors ([`Serializer`],
//!   [`Deserializer`] and their little-endian counterparts),
//! - the CRC-16/CCITT checksum protecting SIP packets,
//! - the HDLC and COBS framing codecs with their byte-fed decoders.
//!
//! The framing layer is deliberately checksum-free: integrity protection is
//! the packet layer's job.

pub mod cobs;
pub mod crc16;
pub mod frame;
pub mod hdlc;
pub mod ser;

pub use cobs::{CobsDecoder, CobsEncoder};
pub use crc16::Crc16Ccitt;
pub use frame::{BufferedFrameDecoder, CodecError, FrameEncoder};
pub use hdlc::{HdlcDecoder, HdlcEncoder};
pub use ser::{Deserializer, DeserializerLittleEndian, Serializer, SerializerLittleEndian};
