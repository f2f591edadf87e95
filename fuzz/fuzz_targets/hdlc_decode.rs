//! Fuzz target for the byte-fed HDLC decoder.
//!
//! # Invariants
//!
//! - Arbitrary stream bytes never panic the decoder
//! - Every decoded frame re-encodes to a stream the decoder accepts again
//! - Errors leave the decoder usable after a reset

#![no_main]

use libfuzzer_sys::fuzz_target;
use sip_codec::{BufferedFrameDecoder, FrameEncoder, HdlcDecoder, HdlcEncoder};

fuzz_target!(|stream: &[u8]| {
    let mut decoder = HdlcDecoder::new(512);
    let mut out = [0_u8; 512];

    for &byte in stream {
        match decoder.push_byte(byte, &mut out) {
            Ok(Some(frame)) => {
                // whatever decoded must survive an encode/decode round trip
                let frame = frame.to_vec();
                let mut encoded = vec![0_u8; 2 * frame.len() + 2];
                let encoded = HdlcEncoder
                    .encode(&frame, &mut encoded)
                    .expect("sized for the worst case");

                let mut check = HdlcDecoder::new(encoded.len());
                let mut check_out = vec![0_u8; frame.len().max(1)];
                let mut decoded = None;
                for &check_byte in encoded {
                    if let Ok(Some(result)) = check.push_byte(check_byte, &mut check_out) {
                        decoded = Some(result.to_vec());
                    }
                }
                assert_eq!(decoded.as_deref(), Some(&frame[..]));
            }
            Ok(None) => {}
            Err(_) => decoder.reset(),
        }
    }
});
