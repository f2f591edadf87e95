//! The filtered software bus.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sip_container::{ConstSharedBufferPointer, ReferenceQueue, SharedBufferPool};
use sip_time::{Clock, HeartbeatLimiter, HeartbeatSink};
use thiserror::Error;

use crate::Message;
use crate::channel::{DispatchOutcome, MessageSink};
use crate::filter::MessageFilter;

/// Errors of a bus-level send.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSendError {
    /// The ingress filter rejected the message.
    #[error("message rejected by the bus ingress filter")]
    InvalidMessage,

    /// No pool buffer was available to copy a raw payload into.
    #[error("no shared buffer available")]
    NoBufferAvailable,

    /// The bus ingress queue is full.
    #[error("bus ingress queue full")]
    SendFailed,
}

/// Errors of the bus worker step.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusProcessError {
    /// Nothing arrived within the timeout.
    #[error("no message available")]
    NoMessageAvailable,
}

/// In-process pub/sub hub with an ingress filter.
///
/// Producers send messages (by message, by shared buffer, or by raw bytes
/// copied into a pool buffer); a worker thread repeatedly calls
/// [`single_message`](Self::single_message) to forward each accepted
/// message to every registered channel whose filter matches. All counters
/// are diagnostics, updated with relaxed atomics.
pub struct FilteredSoftwareBus<I, F, C, S>
where
    C: Clock,
    S: HeartbeatSink,
{
    pool: SharedBufferPool,
    ingress: ReferenceQueue<Message<I>>,
    filter: F,
    channels: Mutex<Vec<Arc<dyn MessageSink<I>>>>,
    heartbeat: Mutex<HeartbeatLimiter<C, S>>,
    accepted: AtomicU32,
    declined: AtomicU32,
    handled: AtomicU32,
    forwarded: AtomicU32,
    failed_copy: AtomicU32,
    failed_send: AtomicU32,
}

impl<I, F, C, S> FilteredSoftwareBus<I, F, C, S>
where
    I: Clone,
    F: MessageFilter<I>,
    C: Clock,
    S: HeartbeatSink,
{
    /// Creates a bus drawing copy buffers from `pool`, with an ingress
    /// queue of `queue_depth` slots.
    pub fn new(
        pool: SharedBufferPool,
        filter: F,
        queue_depth: usize,
        heartbeat: HeartbeatLimiter<C, S>,
    ) -> Self {
        Self {
            pool,
            ingress: ReferenceQueue::new(queue_depth),
            filter,
            channels: Mutex::new(Vec::new()),
            heartbeat: Mutex::new(heartbeat),
            accepted: AtomicU32::new(0),
            declined: AtomicU32::new(0),
            handled: AtomicU32::new(0),
            forwarded: AtomicU32::new(0),
            failed_copy: AtomicU32::new(0),
            failed_send: AtomicU32::new(0),
        }
    }

    /// The ingress filter.
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Mutable ingress filter access for configuration before the bus is
    /// shared.
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// Registers a forwarding destination.
    pub fn register_channel(&self, channel: Arc<dyn MessageSink<I>>) {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).push(channel);
    }

    /// Number of registered channels.
    pub fn number_of_channels(&self) -> usize {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Sends a complete message.
    pub fn send_message(&self, message: Message<I>) -> Result<(), BusSendError> {
        let accepted = message.buffer.with(|payload| self.filter.matches(&message.id, payload));
        if !accepted {
            self.declined.fetch_add(1, Ordering::Relaxed);
            return Err(BusSendError::InvalidMessage);
        }
        self.enqueue(message)
    }

    /// Sends an id plus an already pooled buffer.
    pub fn send_shared(&self, id: I, buffer: ConstSharedBufferPointer) -> Result<(), BusSendError> {
        self.send_message(Message { id, buffer })
    }

    /// Sends an id plus raw bytes, copied into a pool buffer.
    ///
    /// Behaves exactly like the other send forms; the extra failure mode
    /// is [`BusSendError::NoBufferAvailable`] when the pool is exhausted or
    /// the payload exceeds the pool's buffer size.
    pub fn send_bytes(&self, id: I, payload: &[u8]) -> Result<(), BusSendError> {
        if !self.filter.matches(&id, payload) {
            self.declined.fetch_add(1, Ordering::Relaxed);
            return Err(BusSendError::InvalidMessage);
        }
        if payload.len() > self.pool.buffer_size() {
            self.failed_copy.fetch_add(1, Ordering::Relaxed);
            return Err(BusSendError::NoBufferAvailable);
        }
        let Some(buffer) = self.pool.allocate() else {
            self.failed_copy.fetch_add(1, Ordering::Relaxed);
            return Err(BusSendError::NoBufferAvailable);
        };
        buffer.write_at(0, payload);
        let Some(window) = buffer.slice(0, payload.len()) else {
            self.failed_copy.fetch_add(1, Ordering::Relaxed);
            return Err(BusSendError::NoBufferAvailable);
        };
        self.enqueue(Message { id, buffer: window.into_const() })
    }

    /// Dequeues one accepted message and forwards it to every matching
    /// channel. The bus worker thread calls this in a loop.
    pub fn single_message(&self, timeout: Duration) -> Result<(), BusProcessError> {
        self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner).send(timeout);

        let message =
            self.ingress.receive(timeout).map_err(|_| BusProcessError::NoMessageAvailable)?;
        self.handled.fetch_add(1, Ordering::Relaxed);

        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for channel in channels {
            match channel.offer(&message) {
                DispatchOutcome::Forwarded => {
                    self.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                DispatchOutcome::Declined => {
                    self.declined.fetch_add(1, Ordering::Relaxed);
                }
                DispatchOutcome::Failed => {
                    tracing::warn!("channel queue full, message not forwarded");
                    self.failed_send.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(())
    }

    fn enqueue(&self, message: Message<I>) -> Result<(), BusSendError> {
        match self.ingress.send(message, Duration::ZERO) {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.failed_send.fetch_add(1, Ordering::Relaxed);
                Err(BusSendError::SendFailed)
            }
        }
    }

    /// Messages accepted into the ingress queue.
    pub fn number_of_accepted_messages(&self) -> u32 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Messages rejected by the ingress filter or declined by channels.
    pub fn number_of_declined_messages(&self) -> u32 {
        self.declined.load(Ordering::Relaxed)
    }

    /// Messages taken off the ingress queue by the worker loop.
    pub fn number_of_handled_messages(&self) -> u32 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Successful channel deliveries.
    pub fn number_of_forwarded_messages(&self) -> u32 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Raw-byte sends that found no pool buffer.
    pub fn number_of_failed_copy_operations(&self) -> u32 {
        self.failed_copy.load(Ordering::Relaxed)
    }

    /// Sends lost to a full ingress or channel queue.
    pub fn number_of_failed_send_operations(&self) -> u32 {
        self.failed_send.load(Ordering::Relaxed)
    }
}
