//! Bounded blocking queue for handle types.
//!
//! Plain RTOS-style queues move raw bytes; this queue moves full Rust
//! values (shared buffer pointers, response records) while keeping their
//! ownership semantics intact. Send blocks up to a timeout when full,
//! receive blocks up to a timeout when empty; both either complete fully or
//! leave the queue untouched. A zero timeout makes either side non-blocking.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

/// A send that did not complete in time; carries the value back.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue full, send timed out")]
pub struct SendTimeout<T>(pub T);

/// A receive that did not complete in time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue empty, receive timed out")]
pub struct ReceiveTimeout;

/// Bounded FIFO of owned values with blocking timeouts.
///
/// Concurrent producers and consumers are allowed; FIFO order is kept.
#[derive(Debug)]
pub struct ReferenceQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> ReferenceQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "queue capacity must be at least one");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no item is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether no further item can be sent right now.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Enqueues `value`, waiting up to `timeout` for a free slot.
    pub fn send(&self, value: T, timeout: Duration) -> Result<(), SendTimeout<T>> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if items.len() < self.capacity {
                items.push_back(value);
                self.not_empty.notify_one();
                return Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SendTimeout(value));
            }
            let (guard, _) = self
                .not_full
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
    }

    /// Dequeues the oldest item, waiting up to `timeout` for one to arrive.
    pub fn receive(&self, timeout: Duration) -> Result<T, ReceiveTimeout> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = items.pop_front() {
                self.not_full.notify_one();
                return Ok(value);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ReceiveTimeout);
            }
            let (guard, _) = self
                .not_empty
                .wait_timeout(items, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            items = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::shared_buffer::SharedBufferPool;

    #[test]
    fn fifo_order_is_preserved() {
        let queue = ReferenceQueue::new(4);
        for value in 1..=4 {
            queue.send(value, Duration::ZERO).unwrap();
        }
        for expected in 1..=4 {
            assert_eq!(queue.receive(Duration::ZERO), Ok(expected));
        }
    }

    #[test]
    fn zero_timeout_is_non_blocking() {
        let queue: ReferenceQueue<u8> = ReferenceQueue::new(1);
        assert_eq!(queue.receive(Duration::ZERO), Err(ReceiveTimeout));

        queue.send(1, Duration::ZERO).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.send(2, Duration::ZERO), Err(SendTimeout(2)));
        // queue contents untouched by the failed send
        assert_eq!(queue.receive(Duration::ZERO), Ok(1));
    }

    #[test]
    fn send_timeout_returns_the_value() {
        let queue = ReferenceQueue::new(1);
        queue.send("first", Duration::ZERO).unwrap();
        let rejected = queue.send("second", Duration::from_millis(10));
        assert_eq!(rejected, Err(SendTimeout("second")));
    }

    #[test]
    fn blocked_receive_wakes_on_send() {
        let queue = Arc::new(ReferenceQueue::new(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.receive(Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(20));
        queue.send(42, Duration::ZERO).unwrap();
        assert_eq!(consumer.join().unwrap(), Ok(42));
    }

    #[test]
    fn blocked_send_wakes_on_receive() {
        let queue = Arc::new(ReferenceQueue::new(1));
        queue.send(1, Duration::ZERO).unwrap();
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.send(2, Duration::from_secs(5)))
        };
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.receive(Duration::ZERO), Ok(1));
        assert!(producer.join().unwrap().is_ok());
        assert_eq!(queue.receive(Duration::ZERO), Ok(2));
    }

    #[test]
    fn carries_shared_buffers_between_threads() {
        let pool = SharedBufferPool::new(8, 2);
        let queue = Arc::new(ReferenceQueue::new(2));

        let buffer = pool.allocate().unwrap();
        buffer.write_at(0, &[7, 8, 9]);
        queue.send(buffer, Duration::ZERO).unwrap();
        assert_eq!(pool.number_of_free_buffers(), 1);

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.receive(Duration::from_secs(1)))
        };
        let received = consumer.join().unwrap().unwrap();
        assert_eq!(&received.to_vec()[..3], &[7, 8, 9]);

        drop(received);
        assert_eq!(pool.number_of_free_buffers(), 2);
    }

    #[test]
    fn concurrent_producers_and_consumers_conserve_items() {
        let queue = Arc::new(ReferenceQueue::new(4));
        let producers: Vec<_> = (0..4_u32)
            .map(|id| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..100_u32 {
                        queue.send(id * 1000 + i, Duration::from_secs(5)).unwrap();
                    }
                })
            })
            .collect();

        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..400 {
                    seen.push(queue.receive(Duration::from_secs(5)).unwrap());
                }
                seen
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        let mut seen = consumer.join().unwrap();
        seen.sort_unstable();
        let mut expected: Vec<u32> =
            (0..4).flat_map(|id| (0..100).map(move |i| id * 1000 + i)).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }
}
