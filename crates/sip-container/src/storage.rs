//! Storage backends for the ring buffers.
//!
//! A ring buffer performs every element access through the [`Storage`]
//! trait and never touches backend memory directly. Two extensions refine
//! the base contract:
//!
//! - [`DirectStorage`] additionally exposes the backing bytes as contiguous
//!   slices, enabling zero-copy `peek`/`pop` views on the ring.
//! - The metadata hooks ([`Storage::load_metadata`],
//!   [`Storage::sync_metadata`]) let a backend persist the ring's
//!   `(read_index, elements_used)` pair; the default implementations keep
//!   metadata volatile.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sip_codec::{Deserializer, Serializer};
use thiserror::Error;

/// Failure of a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The underlying file or device failed.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-addressed backing store of a ring buffer.
pub trait Storage {
    /// Number of payload bytes this backend can hold.
    fn capacity(&self) -> usize;

    /// Reads `dst.len()` bytes starting at `offset`.
    ///
    /// `offset + dst.len()` never exceeds [`capacity`](Self::capacity); the
    /// ring guarantees this.
    fn read_at(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), StorageError>;

    /// Writes `src` starting at `offset`.
    fn write_at(&mut self, offset: usize, src: &[u8]) -> Result<(), StorageError>;

    /// Previously persisted `(read_index, elements_used)`, if any.
    ///
    /// Called once when a ring is constructed over this backend.
    fn load_metadata(&mut self) -> Option<(u64, u64)> {
        None
    }

    /// Persists `(read_index, elements_used)`.
    ///
    /// Called by the ring on every metadata change. Volatile backends leave
    /// this as the provided no-op.
    fn sync_metadata(&mut self, _read_index: u64, _elements_used: u64) {}
}

/// Storage whose bytes are directly addressable memory.
///
/// Enables the zero-copy view operations on the ring buffer.
pub trait DirectStorage: Storage {
    /// The full backing region.
    fn as_slice(&self) -> &[u8];

    /// The full backing region, mutable.
    fn as_mut_slice(&mut self) -> &mut [u8];
}

/// Heap-allocated array storage.
#[derive(Debug)]
pub struct ArrayStorage {
    data: Box<[u8]>,
}

impl ArrayStorage {
    /// Creates zeroed storage of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { data: vec![0; capacity].into_boxed_slice() }
    }
}

impl Storage for ArrayStorage {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn read_at(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), StorageError> {
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: usize, src: &[u8]) -> Result<(), StorageError> {
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }
}

impl DirectStorage for ArrayStorage {
    fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Size of the persisted metadata header: two big-endian `u64`s.
const METADATA_SIZE: usize = 16;

/// File-backed persistent storage.
///
/// File layout: 8 bytes `read_index`, 8 bytes `elements_used` (both
/// big-endian), then `capacity` payload bytes. Total file size is always
/// `16 + capacity`; a file of any other length is reinitialised at open.
/// Metadata is flushed on every change and the whole file on drop, so a
/// ring over this backend survives a process restart.
#[derive(Debug)]
pub struct FileStorage {
    file: File,
    capacity: usize,
    path: PathBuf,
}

impl FileStorage {
    /// Opens (or creates) the backing file for a ring of `capacity` bytes.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file =
            OpenOptions::new().read(true).write(true).create(true).truncate(false).open(&path)?;

        let expected_len = (METADATA_SIZE + capacity) as u64;
        if file.metadata()?.len() != expected_len {
            tracing::warn!(path = %path.display(), "ring buffer file has unexpected size, reinitialising");
            file.set_len(0)?;
            file.set_len(expected_len)?;
            let mut storage = Self { file, capacity, path };
            storage.write_metadata(0, 0)?;
            return Ok(storage);
        }

        Ok(Self { file, capacity, path })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_metadata(&mut self, read_index: u64, elements_used: u64) -> Result<(), StorageError> {
        let mut header = [0_u8; METADATA_SIZE];
        let mut ser = Serializer::new(&mut header);
        ser.store_u64(read_index);
        ser.store_u64(elements_used);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)?;
        self.file.sync_data()?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_at(&mut self, offset: usize, dst: &mut [u8]) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start((METADATA_SIZE + offset) as u64))?;
        self.file.read_exact(dst)?;
        Ok(())
    }

    fn write_at(&mut self, offset: usize, src: &[u8]) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start((METADATA_SIZE + offset) as u64))?;
        self.file.write_all(src)?;
        Ok(())
    }

    fn load_metadata(&mut self) -> Option<(u64, u64)> {
        let mut header = [0_u8; METADATA_SIZE];
        if self.file.seek(SeekFrom::Start(0)).is_err() || self.file.read_exact(&mut header).is_err() {
            return None;
        }
        let mut de = Deserializer::new(&header);
        Some((de.read_u64(), de.read_u64()))
    }

    fn sync_metadata(&mut self, read_index: u64, elements_used: u64) {
        if let Err(error) = self.write_metadata(read_index, elements_used) {
            tracing::warn!(path = %self.path.display(), %error, "failed to persist ring metadata");
        }
    }
}

impl Drop for FileStorage {
    fn drop(&mut self) {
        let _ = self.file.sync_all();
    }
}
