//! Packet writer and reader.

use sip_codec::{Crc16Ccitt, Deserializer, Serializer};
use thiserror::Error;

use crate::params::{CRC_LENGTH, HEADER_LENGTH, MAX_PACKET_LENGTH, MIN_PACKET_LENGTH};

/// Errors of the packet layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// The buffer cannot hold (or does not hold) a complete packet.
    #[error("buffer too small for a complete packet")]
    LengthTooSmall,

    /// Stored and computed CRC disagree.
    #[error("packet CRC mismatch")]
    CrcMismatch,

    /// The writer has not been finalised yet.
    #[error("packet not finalised")]
    NotFinalized,
}

/// Builds a SIP packet in a caller-provided buffer.
///
/// A writer is either *unfinalised* (no packet slice reachable) or
/// *finalised* (length and CRC written, slice stable). Changing any field
/// drops back to unfinalised until the next [`finalize`](Self::finalize).
#[derive(Debug)]
pub struct PacketWriter<'a> {
    buffer: &'a mut [u8],
    worker_id: u8,
    counter: u8,
    packet_type: u8,
    payload_length: usize,
    payload_fits: bool,
    finalized: bool,
}

impl<'a> PacketWriter<'a> {
    /// Creates a writer over `buffer`. Nothing is written until
    /// [`finalize`](Self::finalize).
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            worker_id: 0,
            counter: 0,
            packet_type: 0,
            payload_length: 0,
            payload_fits: true,
            finalized: false,
        }
    }

    /// Sets the addressed (or answering) worker id.
    pub fn set_worker_id(&mut self, worker_id: u8) {
        self.worker_id = worker_id;
        self.finalized = false;
    }

    /// Sets the free-running correlation counter.
    pub fn set_counter(&mut self, counter: u8) {
        self.counter = counter;
        self.finalized = false;
    }

    /// Sets the packet type.
    pub fn set_type(&mut self, packet_type: u8) {
        self.packet_type = packet_type;
        self.finalized = false;
    }

    /// Copies `payload` into the packet's payload region.
    ///
    /// A payload the buffer cannot hold is remembered as oversized and
    /// surfaces as [`PacketError::LengthTooSmall`] at finalisation.
    pub fn set_payload_data(&mut self, payload: &[u8]) {
        self.finalized = false;
        self.payload_length = payload.len();
        self.payload_fits = HEADER_LENGTH + payload.len() + CRC_LENGTH <= self.buffer.len();
        if self.payload_fits {
            self.buffer[HEADER_LENGTH..HEADER_LENGTH + payload.len()].copy_from_slice(payload);
        }
    }

    /// Writes length field, header fields and CRC; flips to finalised.
    pub fn finalize(&mut self) -> Result<(), PacketError> {
        let total = HEADER_LENGTH + self.payload_length + CRC_LENGTH;
        if !self.payload_fits || total > self.buffer.len() || total > MAX_PACKET_LENGTH {
            return Err(PacketError::LengthTooSmall);
        }

        let length_field = (HEADER_LENGTH + self.payload_length) as u16;
        let mut ser = Serializer::new(self.buffer);
        ser.store_u16(length_field);
        ser.store_u8(self.worker_id);
        ser.store_u8(self.counter);
        ser.store_u8(self.packet_type);

        let crc = Crc16Ccitt::calculate(&self.buffer[..usize::from(length_field)]);
        let mut ser = Serializer::new(&mut self.buffer[usize::from(length_field)..]);
        ser.store_u16(crc);

        self.finalized = true;
        Ok(())
    }

    /// The finished packet bytes; only reachable after a successful
    /// [`finalize`](Self::finalize).
    pub fn as_finalized(&self) -> Result<&[u8], PacketError> {
        if !self.finalized {
            return Err(PacketError::NotFinalized);
        }
        Ok(&self.buffer[..HEADER_LENGTH + self.payload_length + CRC_LENGTH])
    }

    /// Reads the finished packet back for verification.
    pub fn reader(&self) -> Result<PacketReader<'_>, PacketError> {
        PacketReader::read_packet(self.as_finalized()?)
    }
}

/// Validated view of a received SIP packet.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buffer: &'a [u8],
    length_field: usize,
}

impl<'a> PacketReader<'a> {
    /// Validates `buffer` and returns an accessor on success.
    ///
    /// # Errors
    ///
    /// - [`PacketError::LengthTooSmall`] when the buffer is shorter than
    ///   the minimal packet, the declared length is implausible or the
    ///   declared packet does not fit the buffer,
    /// - [`PacketError::CrcMismatch`] when the checksum disagrees.
    pub fn read_packet(buffer: &'a [u8]) -> Result<Self, PacketError> {
        if buffer.len() < MIN_PACKET_LENGTH {
            return Err(PacketError::LengthTooSmall);
        }

        let mut de = Deserializer::new(buffer);
        let length_field = usize::from(de.read_u16());
        if length_field < HEADER_LENGTH
            || length_field + CRC_LENGTH > buffer.len()
            || length_field + CRC_LENGTH > MAX_PACKET_LENGTH
        {
            return Err(PacketError::LengthTooSmall);
        }

        let computed = Crc16Ccitt::calculate(&buffer[..length_field]);
        let mut crc = Deserializer::new(&buffer[length_field..]);
        if crc.read_u16() != computed {
            return Err(PacketError::CrcMismatch);
        }

        Ok(Self { buffer, length_field })
    }

    /// Value of the length field: header plus payload bytes.
    pub fn length(&self) -> u16 {
        self.length_field as u16
    }

    /// Worker id field.
    pub fn worker_id(&self) -> u8 {
        self.buffer[2]
    }

    /// Counter field.
    pub fn counter(&self) -> u8 {
        self.buffer[3]
    }

    /// Type field.
    pub fn packet_type(&self) -> u8 {
        self.buffer[4]
    }

    /// The payload bytes (may be empty).
    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_LENGTH..self.length_field]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{MAX_PACKET_LENGTH, MAX_PAYLOAD_LENGTH};

    #[test]
    fn writes_the_documented_layout() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(&[55, 66]);

        // still not finalised
        assert_eq!(writer.as_finalized(), Err(PacketError::NotFinalized));

        writer.finalize().unwrap();
        let packet = writer.as_finalized().unwrap();
        assert_eq!(packet, &[0x00, 0x07, 0x01, 0x02, 0x03, 0x37, 0x42, 0xD3, 0x62]);

        // the finalised slice is stable
        let again = writer.as_finalized().unwrap();
        assert_eq!(again.len(), 9);
        assert_eq!(again[7], 0xD3);
        assert_eq!(again[8], 0x62);
    }

    #[test]
    fn writes_an_empty_payload_packet() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.finalize().unwrap();

        let packet = writer.as_finalized().unwrap();
        assert_eq!(packet, &[0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78]);
    }

    #[test]
    fn writes_a_maximum_payload_packet() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let payload: Vec<u8> = (0..MAX_PAYLOAD_LENGTH).map(|i| i as u8).collect();

        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(&payload);
        writer.finalize().unwrap();

        let packet = writer.as_finalized().unwrap().to_vec();
        assert_eq!(packet.len(), MAX_PACKET_LENGTH);
        let expected_field = (MAX_PAYLOAD_LENGTH + 5) as u16;
        assert_eq!(packet[0], (expected_field >> 8) as u8);
        assert_eq!(packet[1], (expected_field & 0xFF) as u8);
        for (index, &byte) in payload.iter().enumerate() {
            assert_eq!(packet[5 + index], byte);
        }

        let crc = Crc16Ccitt::calculate(&packet[..packet.len() - 2]);
        assert_eq!(packet[MAX_PACKET_LENGTH - 2], (crc >> 8) as u8);
        assert_eq!(packet[MAX_PACKET_LENGTH - 1], (crc & 0xFF) as u8);
    }

    #[test]
    fn too_small_buffer_fails_at_finalisation() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH - 1];
        let payload = [0_u8; MAX_PAYLOAD_LENGTH];

        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(&payload);

        assert_eq!(writer.finalize(), Err(PacketError::LengthTooSmall));
        assert_eq!(writer.as_finalized(), Err(PacketError::NotFinalized));
    }

    #[test]
    fn round_trips_through_the_reader() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(&[55, 66]);
        writer.finalize().unwrap();

        let reader = writer.reader().unwrap();
        assert_eq!(reader.length(), 7);
        assert_eq!(reader.worker_id(), 1);
        assert_eq!(reader.counter(), 2);
        assert_eq!(reader.packet_type(), 3);
        assert_eq!(reader.payload(), &[55, 66]);
    }

    #[test]
    fn reads_an_empty_payload_packet() {
        let packet = [0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78];
        let reader = PacketReader::read_packet(&packet).unwrap();
        assert_eq!(reader.length(), 5);
        assert_eq!(reader.worker_id(), 1);
        assert_eq!(reader.counter(), 2);
        assert_eq!(reader.packet_type(), 3);
        assert!(reader.payload().is_empty());
    }

    #[test]
    fn rejects_a_buffer_below_the_minimum() {
        let buffer = [0_u8; 2];
        assert_eq!(PacketReader::read_packet(&buffer).err(), Some(PacketError::LengthTooSmall));
    }

    #[test]
    fn rejects_an_implausible_length_field() {
        let mut packet = [0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78];
        // length field below the header size
        packet[1] = 4;
        assert_eq!(PacketReader::read_packet(&packet).err(), Some(PacketError::LengthTooSmall));
    }

    #[test]
    fn rejects_a_length_field_beyond_the_buffer() {
        let mut packet = [0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78];
        packet[1] = 42;
        assert_eq!(PacketReader::read_packet(&packet).err(), Some(PacketError::LengthTooSmall));
    }

    #[test]
    fn rejects_a_corrupted_crc() {
        let mut packet = [0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78];
        packet[6] = 0xFF;
        assert_eq!(PacketReader::read_packet(&packet).err(), Some(PacketError::CrcMismatch));
    }

    #[test]
    fn rejects_a_truncated_packet() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(b"Hello, World!");
        writer.finalize().unwrap();

        let packet = writer.as_finalized().unwrap();
        let truncated = &packet[..packet.len() - 1];
        assert_eq!(
            PacketReader::read_packet(truncated).err(),
            Some(PacketError::LengthTooSmall)
        );
    }

    #[test]
    fn setters_unfinalise_the_packet() {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.finalize().unwrap();
        assert!(writer.as_finalized().is_ok());

        writer.set_counter(9);
        assert_eq!(writer.as_finalized(), Err(PacketError::NotFinalized));
        writer.finalize().unwrap();
        assert_eq!(writer.reader().unwrap().counter(), 9);
    }
}
