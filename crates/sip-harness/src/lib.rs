//! Deterministic test support for the SIP stack.
//!
//! A scripted [`SerialStub`] stands in for the byte link: tests queue the
//! bytes "the wire" will deliver and inspect everything the code under test
//! transmitted. Together with the manually advanced clock re-exported from
//! `sip-time` this makes transport and protocol tests reproducible without
//! real I/O or wall-clock waits.

pub mod serial_stub;

pub use serial_stub::SerialStub;
pub use sip_time::ManualClock;

use sip_codec::{FrameEncoder, HdlcEncoder};
use sip_proto::PacketWriter;
use sip_proto::params::{MAX_PACKET_LENGTH, WORST_CASE_FRAME_LENGTH};

/// Builds a finalised SIP packet as owned bytes.
///
/// Intended for feeding stubs and asserting on wire contents; panics on
/// invalid combinations since tests control all inputs.
#[must_use]
pub fn packet(worker_id: u8, counter: u8, packet_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut buffer = [0_u8; MAX_PACKET_LENGTH];
    let mut writer = PacketWriter::new(&mut buffer);
    writer.set_worker_id(worker_id);
    writer.set_counter(counter);
    writer.set_type(packet_type);
    writer.set_payload_data(payload);
    assert!(writer.finalize().is_ok(), "test packet must finalise");
    writer.as_finalized().map(<[u8]>::to_vec).unwrap_or_default()
}

/// Wraps `payload` in one HDLC frame.
#[must_use]
pub fn hdlc_frame(payload: &[u8]) -> Vec<u8> {
    let mut scratch = vec![0_u8; WORST_CASE_FRAME_LENGTH.max(2 * payload.len() + 2)];
    let encoded = HdlcEncoder.encode(payload, &mut scratch);
    assert!(encoded.is_ok(), "test frame must encode");
    encoded.map(<[u8]>::to_vec).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_builder_matches_the_wire_layout() {
        assert_eq!(packet(1, 2, 3, &[]), vec![0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78]);
    }

    #[test]
    fn frame_builder_wraps_in_boundaries() {
        let frame = hdlc_frame(&packet(1, 2, 3, &[]));
        assert_eq!(frame.first(), Some(&0x7E));
        assert_eq!(frame.last(), Some(&0x7E));
        assert_eq!(frame.len(), 7 + 2);
    }
}
