//! CRC-16/CCITT packet checksum.

use crc::{CRC_16_IBM_3740, Crc};

/// CRC-16/CCITT-FALSE: polynomial `0x1021`, initial value `0xFFFF`, no
/// reflection, no final XOR.
const CRC16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// CRC-16/CCITT as used by the SIP packet layer.
pub struct Crc16Ccitt;

impl Crc16Ccitt {
    /// Checksum over `data`.
    #[must_use]
    pub fn calculate(data: &[u8]) -> u16 {
        CRC16_CCITT.checksum(data)
    }
}
