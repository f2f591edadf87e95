//! Coordinator-side packet receiver task.

use std::sync::Arc;
use std::time::Duration;

use sip_proto::PacketReader;
use sip_proto::params::MAX_PACKET_LENGTH;
use sip_time::{Clock, HeartbeatLimiter, HeartbeatSink};

use crate::coordinator::{Coordinator, ResponseData};
use crate::packet_transport::{PacketRx, PacketTx};

/// Result of one receive iteration.
///
/// Every outcome except `Success` is recoverable by looping again; the
/// receiver never tears itself down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A response was parsed and handed to the coordinator.
    Success,
    /// The framed transport reported a timeout or a transport failure.
    ReceiveError,
    /// A frame arrived but did not parse as a valid packet. The packet is
    /// dropped.
    ReadError,
    /// The coordinator's response queue was full. The response is dropped.
    QueueError,
}

/// Periodic task feeding the coordinator's response queue.
///
/// Single-threaded reader: it exclusively owns the receive half of the
/// transport and only borrows the coordinator long enough to enqueue. One
/// receiver per coordinator; multiple coordinators need multiple receivers.
pub struct CoordinatorPacketReceiver<R, T, C, S>
where
    R: PacketRx,
    T: PacketTx,
    C: Clock,
    S: HeartbeatSink,
{
    transport: R,
    coordinator: Arc<Coordinator<T>>,
    heartbeat: HeartbeatLimiter<C, S>,
}

impl<R, T, C, S> CoordinatorPacketReceiver<R, T, C, S>
where
    R: PacketRx,
    T: PacketTx,
    C: Clock,
    S: HeartbeatSink,
{
    /// Creates a receiver feeding `coordinator`.
    pub fn new(
        transport: R,
        coordinator: Arc<Coordinator<T>>,
        heartbeat: HeartbeatLimiter<C, S>,
    ) -> Self {
        Self { transport, coordinator, heartbeat }
    }

    /// Runs one receive iteration bounded by `timeout`.
    ///
    /// Emits a heartbeat tick (rate-limited) on every iteration, so a
    /// supervisor can tell a quiet link from a dead receiver thread.
    pub fn receive_packet(&mut self, timeout: Duration) -> ReceiveOutcome {
        self.heartbeat.send(timeout);

        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let frame = match self.transport.receive(&mut buffer, timeout) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::trace!(%error, "no frame received");
                return ReceiveOutcome::ReceiveError;
            }
        };

        let reader = match PacketReader::read_packet(frame) {
            Ok(reader) => reader,
            Err(error) => {
                tracing::debug!(%error, "dropping invalid packet");
                return ReceiveOutcome::ReadError;
            }
        };

        if self.coordinator.enqueue_response(ResponseData::from(&reader)) {
            ReceiveOutcome::Success
        } else {
            tracing::warn!("response queue full, dropping response");
            ReceiveOutcome::QueueError
        }
    }
}
