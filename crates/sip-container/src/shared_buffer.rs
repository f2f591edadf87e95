//! Reference-counted pool of equal-sized byte buffers.
//!
//! A [`SharedBufferPool`] owns `count` buffers of `buffer_size` bytes each.
//! [`SharedBufferPool::allocate`] hands out a [`SharedBufferPointer`];
//! cloning a pointer shares ownership, and dropping the last pointer of a
//! buffer returns its storage to the pool. Sub-slicing yields a pointer that
//! exposes only a window but keeps the whole buffer alive.
//!
//! The reference count per buffer is the strong count of the `Arc` holding
//! its slot; no bespoke atomics are involved. The pool free list sits
//! behind a mutex and is paired with a condition variable so allocation can
//! optionally block until a buffer is returned.

use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

struct PoolState {
    buffer_size: usize,
    count: usize,
    free: Mutex<Vec<Box<[u8]>>>,
    returned: Condvar,
}

impl PoolState {
    fn give_back(&self, buffer: Box<[u8]>) {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        free.push(buffer);
        self.returned.notify_one();
    }
}

/// One pooled buffer; dropping it returns the storage to its pool.
struct Slot {
    pool: Weak<PoolState>,
    data: RwLock<Box<[u8]>>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let buffer = std::mem::take(self.data.get_mut().unwrap_or_else(PoisonError::into_inner));
        if let Some(pool) = self.pool.upgrade() {
            pool.give_back(buffer);
        }
    }
}

/// Thread-safe pool of equal-sized byte buffers.
///
/// Cloning the pool handle is cheap and shares the same buffers.
#[derive(Clone)]
pub struct SharedBufferPool {
    state: Arc<PoolState>,
}

impl SharedBufferPool {
    /// Creates a pool of `count` zeroed buffers of `buffer_size` bytes.
    #[must_use]
    pub fn new(buffer_size: usize, count: usize) -> Self {
        let free = (0..count).map(|_| vec![0_u8; buffer_size].into_boxed_slice()).collect();
        Self {
            state: Arc::new(PoolState {
                buffer_size,
                count,
                free: Mutex::new(free),
                returned: Condvar::new(),
            }),
        }
    }

    /// Size of each pooled buffer in bytes.
    pub fn buffer_size(&self) -> usize {
        self.state.buffer_size
    }

    /// Total number of buffers in the pool.
    pub fn number_of_buffers(&self) -> usize {
        self.state.count
    }

    /// Number of buffers currently available for allocation.
    pub fn number_of_free_buffers(&self) -> usize {
        self.state.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Hands out a free buffer, or `None` when the pool is exhausted.
    pub fn allocate(&self) -> Option<SharedBufferPointer> {
        let buffer = self.state.free.lock().unwrap_or_else(PoisonError::into_inner).pop()?;
        Some(self.wrap(buffer))
    }

    /// Like [`allocate`](Self::allocate), but waits up to `timeout` for a
    /// buffer to be returned. A zero timeout never blocks.
    pub fn allocate_timeout(&self, timeout: Duration) -> Option<SharedBufferPointer> {
        let deadline = std::time::Instant::now() + timeout;
        let mut free = self.state.free.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(buffer) = free.pop() {
                return Some(self.wrap(buffer));
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .state
                .returned
                .wait_timeout(free, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            free = guard;
        }
    }

    fn wrap(&self, buffer: Box<[u8]>) -> SharedBufferPointer {
        let len = buffer.len();
        let slot =
            Arc::new(Slot { pool: Arc::downgrade(&self.state), data: RwLock::new(buffer) });
        SharedBufferPointer { slot, offset: 0, len }
    }
}

/// Owning handle to a pooled buffer (or a window of one).
///
/// Clones share the buffer; the storage returns to the pool when the last
/// clone (including all read-only and sub-slice handles) is gone.
#[derive(Clone)]
pub struct SharedBufferPointer {
    slot: Arc<Slot>,
    offset: usize,
    len: usize,
}

impl SharedBufferPointer {
    /// Length of the visible window in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the visible window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runs `f` over the visible bytes.
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let data = self.slot.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&data[self.offset..self.offset + self.len])
    }

    /// Runs `f` over the visible bytes, mutably.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.slot.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut data[self.offset..self.offset + self.len])
    }

    /// Copies `src` into the window at `offset`.
    ///
    /// Returns `false` when the copy would exceed the window.
    pub fn write_at(&self, offset: usize, src: &[u8]) -> bool {
        if offset + src.len() > self.len {
            return false;
        }
        self.with_mut(|data| data[offset..offset + src.len()].copy_from_slice(src));
        true
    }

    /// The visible bytes as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.with(<[u8]>::to_vec)
    }

    /// A handle onto a window of this buffer, sharing its lifetime.
    ///
    /// Returns `None` when the requested window exceeds the current one.
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Option<Self> {
        if offset + len > self.len {
            return None;
        }
        Some(Self { slot: Arc::clone(&self.slot), offset: self.offset + offset, len })
    }

    /// Converts into a read-only handle.
    #[must_use]
    pub fn into_const(self) -> ConstSharedBufferPointer {
        ConstSharedBufferPointer { inner: self }
    }
}

impl std::fmt::Debug for SharedBufferPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBufferPointer")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Read-only handle to a pooled buffer.
///
/// Shares ownership exactly like [`SharedBufferPointer`] but cannot mutate
/// the payload.
#[derive(Clone, Debug)]
pub struct ConstSharedBufferPointer {
    inner: SharedBufferPointer,
}

impl ConstSharedBufferPointer {
    /// Length of the visible window in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the visible window is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Runs `f` over the visible bytes.
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        self.inner.with(f)
    }

    /// The visible bytes as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.inner.to_vec()
    }

    /// A read-only handle onto a window of this buffer.
    #[must_use]
    pub fn slice(&self, offset: usize, len: usize) -> Option<Self> {
        self.inner.slice(offset, len).map(SharedBufferPointer::into_const)
    }
}

impl From<SharedBufferPointer> for ConstSharedBufferPointer {
    fn from(pointer: SharedBufferPointer) -> Self {
        pointer.into_const()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_tracks_free_count() {
        let pool = SharedBufferPool::new(10, 3);
        assert_eq!(pool.number_of_buffers(), 3);
        assert_eq!(pool.number_of_free_buffers(), 3);

        let first = pool.allocate().unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(pool.number_of_free_buffers(), 2);

        drop(first);
        assert_eq!(pool.number_of_free_buffers(), 3);
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let pool = SharedBufferPool::new(4, 1);
        let held = pool.allocate().unwrap();
        assert!(pool.allocate().is_none());
        assert!(pool.allocate_timeout(Duration::ZERO).is_none());
        drop(held);
        assert!(pool.allocate().is_some());
    }

    #[test]
    fn clones_share_the_buffer_and_the_refcount() {
        let pool = SharedBufferPool::new(8, 2);
        let original = pool.allocate().unwrap();
        original.write_at(0, &[1, 2, 3]);

        let copy = original.clone();
        let read_only: ConstSharedBufferPointer = original.clone().into();
        assert_eq!(pool.number_of_free_buffers(), 1);

        drop(original);
        drop(copy);
        // the read-only handle still keeps the buffer alive
        assert_eq!(pool.number_of_free_buffers(), 1);
        assert_eq!(&read_only.to_vec()[..3], &[1, 2, 3]);

        drop(read_only);
        assert_eq!(pool.number_of_free_buffers(), 2);
    }

    #[test]
    fn sub_slices_expose_a_window_and_share_lifetime() {
        let pool = SharedBufferPool::new(10, 1);
        let buffer = pool.allocate().unwrap();
        buffer.with_mut(|data| {
            for (index, byte) in data.iter_mut().enumerate() {
                *byte = index as u8;
            }
        });

        let window = buffer.slice(4, 3).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.to_vec(), vec![4, 5, 6]);
        assert!(buffer.slice(8, 3).is_none());

        drop(buffer);
        assert_eq!(pool.number_of_free_buffers(), 0);
        drop(window);
        assert_eq!(pool.number_of_free_buffers(), 1);
    }

    #[test]
    fn writes_through_one_handle_are_visible_through_all() {
        let pool = SharedBufferPool::new(6, 1);
        let a = pool.allocate().unwrap();
        let b = a.clone();
        a.write_at(2, &[0xAA]);
        assert_eq!(b.to_vec()[2], 0xAA);
        assert!(!a.write_at(5, &[1, 2]));
    }

    #[test]
    fn allocate_timeout_waits_for_a_returned_buffer() {
        let pool = SharedBufferPool::new(4, 1);
        let held = pool.allocate().unwrap();

        let waiter = {
            let pool = pool.clone();
            std::thread::spawn(move || pool.allocate_timeout(Duration::from_secs(5)).is_some())
        };
        std::thread::sleep(Duration::from_millis(20));
        drop(held);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn reuse_after_many_cycles_never_leaks_buffers() {
        let pool = SharedBufferPool::new(16, 4);
        for round in 0..100 {
            let a = pool.allocate().unwrap();
            let b = pool.allocate().unwrap();
            a.write_at(0, &[round as u8]);
            let window = b.slice(0, 8).unwrap();
            drop(b);
            drop(window);
            drop(a);
            assert_eq!(pool.number_of_free_buffers(), 4);
        }
    }
}
