//! Property-based round-trip tests for the packet layer.

use proptest::prelude::*;
use sip_proto::params::{MAX_PACKET_LENGTH, MAX_PAYLOAD_LENGTH};
use sip_proto::{PacketReader, PacketWriter};

proptest! {
    #[test]
    fn every_packet_round_trips(
        worker_id in any::<u8>(),
        counter in any::<u8>(),
        packet_type in any::<u8>(),
        payload in proptest::collection::vec(any::<u8>(), 0..MAX_PAYLOAD_LENGTH),
    ) {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(worker_id);
        writer.set_counter(counter);
        writer.set_type(packet_type);
        writer.set_payload_data(&payload);
        writer.finalize().expect("packet within limits must finalise");

        let packet = writer.as_finalized().expect("finalised");
        let reader = PacketReader::read_packet(packet).expect("own packet must validate");
        prop_assert_eq!(reader.worker_id(), worker_id);
        prop_assert_eq!(reader.counter(), counter);
        prop_assert_eq!(reader.packet_type(), packet_type);
        prop_assert_eq!(reader.payload(), &payload[..]);
        prop_assert_eq!(usize::from(reader.length()), 5 + payload.len());
    }

    #[test]
    fn any_single_byte_corruption_is_detected(
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        position in any::<proptest::sample::Index>(),
        flip in 1..=255_u8,
    ) {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(1);
        writer.set_counter(2);
        writer.set_type(3);
        writer.set_payload_data(&payload);
        writer.finalize().expect("finalise");

        let mut packet = writer.as_finalized().expect("finalised").to_vec();
        let index = position.index(packet.len());
        packet[index] ^= flip;

        // a flipped bit is never silently accepted
        prop_assert!(PacketReader::read_packet(&packet).is_err());
    }
}
