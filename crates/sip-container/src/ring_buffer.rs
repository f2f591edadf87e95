//! FIFO byte ring buffer over pluggable storage.

use thiserror::Error;

use crate::storage::{DirectStorage, Storage, StorageError};

/// Errors of ring buffer operations.
#[derive(Error, Debug)]
pub enum RingError {
    /// Not enough free space (append) or stored data (pop/peek).
    #[error("ring buffer out of memory")]
    OutOfMemory,

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Byte ring buffer.
///
/// State is the `(read_index, elements_used)` pair on a fixed-capacity
/// [`Storage`]. New data is appended at `(read_index + used) % capacity`;
/// pops advance the read index. Every public operation is atomic with
/// respect to the ring's state: it either completes fully or leaves the
/// ring unchanged.
///
/// Backends that persist metadata (see [`Storage::load_metadata`]) seed the
/// ring state at construction and receive every metadata change through
/// [`Storage::sync_metadata`], which is what makes the file-backed ring
/// survive restarts.
#[derive(Debug)]
pub struct RingBuffer<S: Storage> {
    storage: S,
    read_index: usize,
    used: usize,
}

impl<S: Storage> RingBuffer<S> {
    /// Creates a ring over `storage`, restoring persisted metadata if the
    /// backend provides any. Implausible metadata resets the ring to empty.
    pub fn new(mut storage: S) -> Self {
        let capacity = storage.capacity();
        let (read_index, used) = match storage.load_metadata() {
            Some((read_index, used))
                if (read_index as usize) < capacity.max(1) && used as usize <= capacity =>
            {
                (read_index as usize, used as usize)
            }
            Some(_) => {
                tracing::warn!("implausible ring metadata, resetting to empty");
                storage.sync_metadata(0, 0);
                (0, 0)
            }
            None => (0, 0),
        };
        Self { storage, read_index, used }
    }

    /// Total number of bytes the ring can hold.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Number of bytes currently stored.
    pub fn available_elements(&self) -> usize {
        self.used
    }

    /// Number of stored bytes readable without wrapping.
    pub fn available_continuous_elements(&self) -> usize {
        self.used.min(self.capacity() - self.read_index)
    }

    /// Number of bytes that can still be appended.
    pub fn free_elements(&self) -> usize {
        self.capacity() - self.used
    }

    /// Whether no bytes are stored.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    pub(crate) fn read_index(&self) -> usize {
        self.read_index
    }

    /// Appends all of `data`, or nothing.
    pub fn append(&mut self, data: &[u8]) -> Result<(), RingError> {
        if data.len() > self.free_elements() {
            return Err(RingError::OutOfMemory);
        }
        let capacity = self.capacity();
        let write_index = (self.read_index + self.used) % capacity;
        let first = data.len().min(capacity - write_index);
        self.storage.write_at(write_index, &data[..first])?;
        if first < data.len() {
            self.storage.write_at(0, &data[first..])?;
        }
        self.used += data.len();
        self.sync();
        Ok(())
    }

    /// Advances the write position by `count` bytes without writing content.
    ///
    /// Used by the chunked layers to keep slots aligned.
    pub fn append_padding_elements(&mut self, count: usize) -> Result<(), RingError> {
        if count > self.free_elements() {
            return Err(RingError::OutOfMemory);
        }
        self.used += count;
        self.sync();
        Ok(())
    }

    /// Removes exactly `dst.len()` bytes from the head into `dst`, or
    /// nothing when fewer bytes are stored.
    pub fn pop_into(&mut self, dst: &mut [u8]) -> Result<(), RingError> {
        self.read_from_head(dst, 0)?;
        self.advance(dst.len());
        Ok(())
    }

    /// Copies `dst.len()` bytes starting `offset` bytes into the stored
    /// region, without consuming them.
    pub fn peek_into(&mut self, dst: &mut [u8], offset: usize) -> Result<(), RingError> {
        self.read_from_head(dst, offset)
    }

    /// Drops up to `count` bytes from the head; returns the number dropped.
    pub fn discard(&mut self, count: usize) -> usize {
        let dropped = count.min(self.used);
        self.advance(dropped);
        dropped
    }

    /// Empties the ring.
    pub fn reset(&mut self) {
        self.used = 0;
        self.sync();
    }

    /// Truncates the stored region to its first `count` bytes, dropping the
    /// newest data beyond that.
    pub fn reset_after(&mut self, count: usize) {
        self.used = self.used.min(count);
        self.sync();
    }

    /// Rewrites `src.len()` bytes `offset` bytes into the stored region.
    pub(crate) fn write_at_used(&mut self, offset: usize, src: &[u8]) -> Result<(), RingError> {
        if offset + src.len() > self.used {
            return Err(RingError::OutOfMemory);
        }
        let capacity = self.capacity();
        let start = (self.read_index + offset) % capacity;
        let first = src.len().min(capacity - start);
        self.storage.write_at(start, &src[..first])?;
        if first < src.len() {
            self.storage.write_at(0, &src[first..])?;
        }
        Ok(())
    }

    fn read_from_head(&mut self, dst: &mut [u8], offset: usize) -> Result<(), RingError> {
        if offset + dst.len() > self.used {
            return Err(RingError::OutOfMemory);
        }
        let capacity = self.capacity();
        let start = (self.read_index + offset) % capacity;
        let first = dst.len().min(capacity - start);
        let (head, tail) = dst.split_at_mut(first);
        self.storage.read_at(start, head)?;
        if !tail.is_empty() {
            self.storage.read_at(0, tail)?;
        }
        Ok(())
    }

    fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.used);
        self.read_index = (self.read_index + count) % self.capacity().max(1);
        self.used -= count;
        self.sync();
    }

    fn sync(&mut self) {
        self.storage.sync_metadata(self.read_index as u64, self.used as u64);
    }
}

impl<S: DirectStorage> RingBuffer<S> {
    /// Removes up to `count` bytes from the head and returns them as one
    /// contiguous view. The view may be shorter than `count` when the stored
    /// region wraps; a second call picks up the remainder.
    pub fn pop(&mut self, count: usize) -> &[u8] {
        let take = count.min(self.available_continuous_elements());
        let start = self.read_index;
        self.advance(take);
        &self.storage.as_slice()[start..start + take]
    }

    /// A contiguous view of `count` bytes starting `offset` bytes into the
    /// stored region. Returns an empty slice when the request cannot be
    /// satisfied without wrapping.
    pub fn peek(&self, count: usize, offset: usize) -> &[u8] {
        if offset + count > self.used {
            return &[];
        }
        let capacity = self.capacity();
        let start = (self.read_index + offset) % capacity;
        if start + count > capacity {
            return &[];
        }
        &self.storage.as_slice()[start..start + count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ArrayStorage;

    fn ring(capacity: usize) -> RingBuffer<ArrayStorage> {
        RingBuffer::new(ArrayStorage::new(capacity))
    }

    #[test]
    fn starts_empty() {
        let ring = ring(1024);
        assert!(ring.is_empty());
        assert_eq!(ring.available_elements(), 0);
        assert_eq!(ring.free_elements(), 1024);
        assert_eq!(ring.capacity(), 1024);
    }

    #[test]
    fn append_then_pop_returns_the_data() {
        let mut ring = ring(1024);
        ring.append(&[42; 100]).unwrap();
        assert_eq!(ring.available_elements(), 100);
        assert_eq!(ring.free_elements(), 1024 - 100);

        let popped = ring.pop(10);
        assert_eq!(popped.len(), 10);
        assert_eq!(popped[0], 42);
        assert_eq!(ring.available_elements(), 90);
        assert_eq!(ring.free_elements(), 1024 - 90);
    }

    #[test]
    fn append_refuses_partial_writes() {
        let mut ring = ring(10);
        ring.append(&[1; 8]).unwrap();
        assert!(matches!(ring.append(&[2; 3]), Err(RingError::OutOfMemory)));
        // unchanged
        assert_eq!(ring.available_elements(), 8);
        ring.append(&[2; 2]).unwrap();
        assert_eq!(ring.free_elements(), 0);
    }

    #[test]
    fn data_survives_the_wrap() {
        let mut ring = ring(8);
        ring.append(&[1, 2, 3, 4, 5, 6]).unwrap();
        let mut drain = [0_u8; 5];
        ring.pop_into(&mut drain).unwrap();
        assert_eq!(drain, [1, 2, 3, 4, 5]);

        // write wraps around the end of the storage
        ring.append(&[7, 8, 9, 10, 11]).unwrap();
        let mut out = [0_u8; 6];
        ring.pop_into(&mut out).unwrap();
        assert_eq!(out, [6, 7, 8, 9, 10, 11]);
        assert!(ring.is_empty());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut ring = ring(16);
        ring.append(&[1, 2, 3, 4]).unwrap();

        let mut peeked = [0_u8; 2];
        ring.peek_into(&mut peeked, 1).unwrap();
        assert_eq!(peeked, [2, 3]);
        assert_eq!(ring.available_elements(), 4);

        assert_eq!(ring.peek(2, 1), &[2, 3]);
        assert!(ring.peek(4, 1).is_empty());
    }

    #[test]
    fn padding_reserves_space_without_content() {
        let mut ring = ring(16);
        ring.append_padding_elements(4).unwrap();
        assert_eq!(ring.available_elements(), 4);
        assert!(matches!(ring.append_padding_elements(13), Err(RingError::OutOfMemory)));
    }

    #[test]
    fn reset_after_truncates_newest_data() {
        let mut ring = ring(16);
        ring.append(&[1, 2, 3, 4, 5]).unwrap();
        ring.reset_after(2);
        assert_eq!(ring.available_elements(), 2);
        let mut out = [0_u8; 2];
        ring.pop_into(&mut out).unwrap();
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn pop_never_returns_a_split_view() {
        let mut ring = ring(8);
        ring.append(&[1; 6]).unwrap();
        ring.discard(6);
        ring.append(&[2; 6]).unwrap();
        // stored region wraps: 2 bytes at the end, 4 at the start
        let first = ring.pop(6).to_vec();
        assert_eq!(first, vec![2, 2]);
        let second = ring.pop(6).to_vec();
        assert_eq!(second, vec![2, 2, 2, 2]);
    }

    #[test]
    fn conservation_over_interleaved_appends_and_pops() {
        let mut ring = ring(64);
        let mut appended = Vec::new();
        let mut popped = Vec::new();
        let mut next = 0_u8;

        for round in 0..200 {
            let burst = (round % 7) + 1;
            let data: Vec<u8> = (0..burst).map(|_| { next = next.wrapping_add(1); next }).collect();
            if ring.free_elements() >= data.len() {
                ring.append(&data).unwrap();
                appended.extend_from_slice(&data);
            }
            let drain = round % 5;
            let take = drain.min(ring.available_elements());
            let mut out = vec![0_u8; take];
            ring.pop_into(&mut out).unwrap();
            popped.extend_from_slice(&out);
        }
        let mut rest = vec![0_u8; ring.available_elements()];
        ring.pop_into(&mut rest).unwrap();
        popped.extend_from_slice(&rest);

        assert_eq!(popped, appended);
    }
}
