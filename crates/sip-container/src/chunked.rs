//! Ring buffer with constant-sized slots.
//!
//! Each slot holds a header (payload length + flag byte) and up to
//! `PAYLOAD` payload bytes; shorter payloads are padded so every slot
//! occupies exactly the same number of ring bytes. Because the ring
//! capacity is an exact multiple of the slot size, a slot never wraps
//! around the end of the storage and indexed peeks can hand out contiguous
//! views.

use sip_codec::{Deserializer, Serializer};

use crate::ring_buffer::RingBuffer;
use crate::storage::{ArrayStorage, DirectStorage, Storage};

/// Bytes per chunk header: `u64` payload length plus one flag byte.
pub const CHUNK_HEADER_SIZE: usize = 9;

/// Ring buffer of constant-sized chunks, layered on the byte ring.
///
/// `PAYLOAD` is the usable byte count per chunk. Appends are all-or-nothing
/// and pops always remove exactly one chunk, so the used byte count is a
/// multiple of the slot size at all times.
#[derive(Debug)]
pub struct ChunkedRingBuffer<S: Storage, const PAYLOAD: usize> {
    ring: RingBuffer<S>,
}

impl<const PAYLOAD: usize> ChunkedRingBuffer<ArrayStorage, PAYLOAD> {
    /// Creates an array-backed chunk ring with `slots` slots.
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        Self::new(ArrayStorage::new(slots * Self::CHUNK_TOTAL_SIZE))
    }
}

impl<S: Storage, const PAYLOAD: usize> ChunkedRingBuffer<S, PAYLOAD> {
    /// Ring bytes occupied by one chunk.
    pub const CHUNK_TOTAL_SIZE: usize = CHUNK_HEADER_SIZE + PAYLOAD;

    /// Creates a chunk ring over `storage`.
    ///
    /// The storage capacity must be an exact multiple of the slot size;
    /// anything else is a construction bug.
    #[must_use]
    pub fn new(storage: S) -> Self {
        let ring = RingBuffer::new(storage);
        assert!(
            ring.capacity() % Self::CHUNK_TOTAL_SIZE == 0,
            "storage capacity must be a multiple of the chunk size"
        );
        Self { ring }
    }

    /// Usable bytes per chunk.
    #[must_use]
    pub const fn chunk_size() -> usize {
        PAYLOAD
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.ring.capacity() / Self::CHUNK_TOTAL_SIZE - self.used_slots()
    }

    /// Number of occupied slots.
    pub fn used_slots(&self) -> usize {
        self.ring.available_elements() / Self::CHUNK_TOTAL_SIZE
    }

    /// Whether no chunk is stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Appends one chunk, fully or not at all.
    ///
    /// Fails when `data` exceeds the chunk payload size or no free slot is
    /// left. With `zero_out` the padding after a short payload is actually
    /// written as zeroes instead of merely skipped. A storage failure
    /// mid-sequence rolls the ring back to its previous state.
    pub fn append(&mut self, data: &[u8], flags: u8, zero_out: bool) -> bool {
        if data.len() > PAYLOAD || self.ring.free_elements() < Self::CHUNK_TOTAL_SIZE {
            return false;
        }

        let mut header = [0_u8; CHUNK_HEADER_SIZE];
        let mut ser = Serializer::new(&mut header);
        ser.store_u64(data.len() as u64);
        ser.store_u8(flags);

        // header, payload and filler commit separately; remember the used
        // count so a storage failure cannot leave a partial chunk behind
        let used_before = self.ring.available_elements();
        if let Err(error) = self.try_append(&header, data, zero_out) {
            tracing::warn!(%error, "chunk append failed on storage backend, rolling back");
            self.ring.reset_after(used_before);
            return false;
        }
        debug_assert!(self.ring.available_elements() % Self::CHUNK_TOTAL_SIZE == 0);
        true
    }

    fn try_append(
        &mut self,
        header: &[u8],
        data: &[u8],
        zero_out: bool,
    ) -> Result<(), crate::ring_buffer::RingError> {
        self.ring.append(header)?;
        self.ring.append(data)?;

        let mut remaining = PAYLOAD - data.len();
        if zero_out {
            // bounded scratch, written repeatedly
            let zeroes = [0_u8; 64];
            while remaining > 0 {
                let step = remaining.min(zeroes.len());
                self.ring.append(&zeroes[..step])?;
                remaining -= step;
            }
        } else {
            self.ring.append_padding_elements(remaining)?;
        }
        Ok(())
    }

    /// Rewrites the flag byte of the oldest chunk in place.
    pub fn set_flags_to_head(&mut self, flags: u8) -> bool {
        if self.is_empty() {
            return false;
        }
        self.ring.write_at_used(CHUNK_HEADER_SIZE - 1, &[flags]).is_ok()
    }

    /// Flag byte of the `index`-th oldest chunk.
    pub fn peek_flags(&mut self, index: usize) -> Option<u8> {
        let mut header = [0_u8; CHUNK_HEADER_SIZE];
        self.ring.peek_into(&mut header, index * Self::CHUNK_TOTAL_SIZE).ok()?;
        Some(header[CHUNK_HEADER_SIZE - 1])
    }

    /// Payload length of the `index`-th oldest chunk.
    pub fn peek_length(&mut self, index: usize) -> Option<usize> {
        let mut header = [0_u8; CHUNK_HEADER_SIZE];
        self.ring.peek_into(&mut header, index * Self::CHUNK_TOTAL_SIZE).ok()?;
        let mut de = Deserializer::new(&header);
        Some(de.read_u64() as usize)
    }

    /// Removes the oldest chunk. No partial pops.
    pub fn pop(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.ring.discard(Self::CHUNK_TOTAL_SIZE) == Self::CHUNK_TOTAL_SIZE
    }

    /// Copies the payload of the `index`-th oldest chunk into `dst`;
    /// returns the filled prefix.
    pub fn peek_into<'a>(&mut self, index: usize, dst: &'a mut [u8]) -> Option<&'a [u8]> {
        let length = self.peek_length(index)?;
        if dst.len() < length {
            return None;
        }
        let offset = index * Self::CHUNK_TOTAL_SIZE + CHUNK_HEADER_SIZE;
        self.ring.peek_into(&mut dst[..length], offset).ok()?;
        Some(&dst[..length])
    }

    /// Drops all chunks.
    pub fn reset(&mut self) {
        self.ring.reset();
    }

    /// Keeps the oldest `count` chunks and drops the rest.
    pub fn reset_elements_from(&mut self, count: usize) {
        self.ring.reset_after(count * Self::CHUNK_TOTAL_SIZE);
    }
}

impl<S: DirectStorage, const PAYLOAD: usize> ChunkedRingBuffer<S, PAYLOAD> {
    /// Zero-copy view of the payload of the `index`-th oldest chunk.
    ///
    /// Returns an empty slice when fewer than `index + 1` chunks are stored.
    pub fn peek(&self, index: usize) -> &[u8] {
        let slot = self.ring.peek(Self::CHUNK_TOTAL_SIZE, index * Self::CHUNK_TOTAL_SIZE);
        if slot.is_empty() {
            return &[];
        }
        let mut de = Deserializer::new(slot);
        let length = de.read_u64() as usize;
        &slot[CHUNK_HEADER_SIZE..CHUNK_HEADER_SIZE + length]
    }
}
