//! Typed bus channels.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use sip_container::ReferenceQueue;
use thiserror::Error;

use crate::Message;
use crate::filter::MessageFilter;

/// Errors of a channel-level send.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSendError {
    /// The channel's filter declined the message.
    #[error("message declined by the channel filter")]
    SendFailed,

    /// The channel's queue is full; the message was dropped.
    #[error("no channel queue slot available")]
    NoBufferAvailable,
}

/// Errors of a channel-level receive.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelReceiveError {
    /// Nothing queued within the timeout.
    #[error("no message available")]
    NoMessageAvailable,
}

/// What happened when the bus offered a message to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Filter matched, message enqueued.
    Forwarded,
    /// Filter did not match.
    Declined,
    /// Filter matched but the sink could not take the message.
    Failed,
}

/// Destination the bus worker loop can forward messages to.
pub trait MessageSink<I>: Send + Sync {
    /// Offers one message; never blocks.
    fn offer(&self, message: &Message<I>) -> DispatchOutcome;
}

/// A subscriber endpoint: a filter plus a bounded queue of messages.
///
/// Configure the filter before sharing the channel; afterwards the channel
/// is used concurrently by the bus worker (sending) and the subscriber
/// (receiving), both through `&self`.
pub struct BusChannel<I, F> {
    filter: F,
    queue: ReferenceQueue<Message<I>>,
    incoming: AtomicU32,
    appended: AtomicU32,
    failed_receptions: AtomicU32,
    retrieved: AtomicU32,
}

impl<I, F: MessageFilter<I>> BusChannel<I, F> {
    /// Creates a channel with `depth` queue slots.
    pub fn new(filter: F, depth: usize) -> Self {
        Self {
            filter,
            queue: ReferenceQueue::new(depth),
            incoming: AtomicU32::new(0),
            appended: AtomicU32::new(0),
            failed_receptions: AtomicU32::new(0),
            retrieved: AtomicU32::new(0),
        }
    }

    /// The channel's filter.
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Mutable filter access for configuration before the channel is
    /// shared.
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// Whether `message` passes the channel filter. Subscription counters
    /// advance exactly as on a real send.
    pub fn matches(&self, message: &Message<I>) -> bool {
        message.buffer.with(|payload| self.filter.matches(&message.id, payload))
    }

    /// Filters and, on a match, enqueues `message` without blocking.
    pub fn send_message(&self, message: Message<I>) -> Result<(), ChannelSendError> {
        self.incoming.fetch_add(1, Ordering::Relaxed);
        if !self.matches(&message) {
            return Err(ChannelSendError::SendFailed);
        }
        match self.queue.send(message, Duration::ZERO) {
            Ok(()) => {
                self.appended.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(_) => {
                self.failed_receptions.fetch_add(1, Ordering::Relaxed);
                Err(ChannelSendError::NoBufferAvailable)
            }
        }
    }

    /// Receives the oldest queued message, waiting up to `timeout`.
    pub fn receive_message(&self, timeout: Duration) -> Result<Message<I>, ChannelReceiveError> {
        match self.queue.receive(timeout) {
            Ok(message) => {
                self.retrieved.fetch_add(1, Ordering::Relaxed);
                Ok(message)
            }
            Err(_) => Err(ChannelReceiveError::NoMessageAvailable),
        }
    }

    /// Messages currently queued.
    pub fn current_number_of_messages(&self) -> usize {
        self.queue.len()
    }

    /// Messages offered to this channel so far.
    pub fn number_of_incoming_messages(&self) -> u32 {
        self.incoming.load(Ordering::Relaxed)
    }

    /// Messages that passed the filter and were enqueued.
    pub fn number_of_appended_messages(&self) -> u32 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Messages lost to a full queue.
    pub fn number_of_failed_receptions(&self) -> u32 {
        self.failed_receptions.load(Ordering::Relaxed)
    }

    /// Messages handed out via [`receive_message`](Self::receive_message).
    pub fn number_of_retrieved_messages(&self) -> u32 {
        self.retrieved.load(Ordering::Relaxed)
    }
}

impl<I, F> MessageSink<I> for BusChannel<I, F>
where
    I: Clone + Send + Sync,
    F: MessageFilter<I> + Send + Sync,
{
    fn offer(&self, message: &Message<I>) -> DispatchOutcome {
        match self.send_message(message.clone()) {
            Ok(()) => DispatchOutcome::Forwarded,
            Err(ChannelSendError::SendFailed) => DispatchOutcome::Declined,
            Err(ChannelSendError::NoBufferAvailable) => DispatchOutcome::Failed,
        }
    }
}
