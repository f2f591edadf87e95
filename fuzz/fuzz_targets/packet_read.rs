//! Fuzz target for the SIP packet reader.
//!
//! # Invariants
//!
//! - Arbitrary buffers never panic the reader
//! - Accepted packets are internally consistent: declared length within
//!   the buffer, payload slice matching the length field

#![no_main]

use libfuzzer_sys::fuzz_target;
use sip_proto::PacketReader;

fuzz_target!(|buffer: &[u8]| {
    if let Ok(packet) = PacketReader::read_packet(buffer) {
        let length = usize::from(packet.length());
        assert!(length >= 5);
        assert!(length + 2 <= buffer.len());
        assert_eq!(packet.payload().len(), length - 5);
        // touching every accessor must be safe
        let _ = (packet.worker_id(), packet.counter(), packet.packet_type());
    }
});
