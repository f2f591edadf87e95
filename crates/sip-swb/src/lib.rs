//! Filtered in-process software bus.
//!
//! Messages are `(id, shared buffer)` pairs. A [`FilteredSoftwareBus`]
//! accepts messages through an ingress filter into a bounded queue; a
//! worker loop forwards each accepted message to every registered
//! [`BusChannel`] whose filter matches. Payloads live in pooled shared
//! buffers, so fan-out to several channels never copies message bytes.

pub mod bus;
pub mod channel;
pub mod filter;

use sip_container::ConstSharedBufferPointer;

pub use bus::{BusProcessError, BusSendError, FilteredSoftwareBus};
pub use channel::{BusChannel, ChannelReceiveError, ChannelSendError, DispatchOutcome, MessageSink};
pub use filter::{BusSubscription, FilterNone, MessageFilter, RangeFilter, SubscriptionFilter};

/// One bus message: an id plus a read-only view of a pooled buffer.
#[derive(Clone, Debug)]
pub struct Message<I> {
    /// Message id, used by every filter.
    pub id: I,
    /// Payload buffer; cloning the message shares it.
    pub buffer: ConstSharedBufferPointer,
}
