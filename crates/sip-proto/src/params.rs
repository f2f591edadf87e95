//! Link profile parameters.
//!
//! Values are project-configurable; the relationships between them are
//! fixed. Coordinator and workers must agree on [`MAX_PACKET_LENGTH`] and
//! the CRC algorithm, and both framed-transport buffer sizes derive from
//! [`WORST_CASE_FRAME_LENGTH`].

use std::time::Duration;

/// Bytes of the fixed packet prefix (length field, worker id, counter, type).
pub const HEADER_LENGTH: usize = 5;

/// Bytes of the trailing CRC.
pub const CRC_LENGTH: usize = 2;

/// Smallest wire size of a packet: prefix plus CRC, empty payload.
pub const MIN_PACKET_LENGTH: usize = HEADER_LENGTH + CRC_LENGTH;

/// Largest allowed payload.
pub const MAX_PAYLOAD_LENGTH: usize = 1024;

/// Largest wire size of a packet.
pub const MAX_PACKET_LENGTH: usize = MAX_PAYLOAD_LENGTH + HEADER_LENGTH + CRC_LENGTH;

/// Worst-case encoded frame holding one maximum-size packet.
///
/// Sized for HDLC (every byte escaped plus two boundary bytes), which also
/// covers COBS.
pub const WORST_CASE_FRAME_LENGTH: usize = 2 * MAX_PACKET_LENGTH + 2;

/// Default time a coordinator waits for a worker's response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default depth of a coordinator's response queue.
pub const RESPONSE_QUEUE_DEPTH: usize = 1;
