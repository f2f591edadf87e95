//! Worker-side response transmission.

use sip_proto::params::MAX_PACKET_LENGTH;
use sip_proto::{PacketError, PacketWriter};
use sip_transport::TransportError;
use thiserror::Error;

use crate::packet_transport::PacketTx;

/// Errors of the worker transmit path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// The response packet could not be built.
    #[error("response packet could not be built: {0}")]
    Packet(#[from] PacketError),

    /// The response could not be transmitted.
    #[error("response transmit failed: {0}")]
    Transmit(#[from] TransportError),
}

/// Responder identified by its worker id.
///
/// Provides the transmit side only. Receiving requests and dispatching on
/// their type is the application's receive loop; it answers through
/// [`send_response`](Self::send_response), echoing the request's counter.
pub struct Worker<T: PacketTx> {
    worker_id: u8,
    transport: T,
}

impl<T: PacketTx> Worker<T> {
    /// Creates a worker answering as `worker_id`.
    pub fn new(worker_id: u8, transport: T) -> Self {
        Self { worker_id, transport }
    }

    /// This worker's id.
    pub fn worker_id(&self) -> u8 {
        self.worker_id
    }

    /// Sends a payload-free response echoing `counter`.
    pub fn send_response(&self, counter: u8, response_type: u8) -> Result<(), WorkerError> {
        self.send_response_with_payload(counter, response_type, &[])
    }

    /// Sends a response carrying `payload`, echoing `counter`.
    pub fn send_response_with_payload(
        &self,
        counter: u8,
        response_type: u8,
        payload: &[u8],
    ) -> Result<(), WorkerError> {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(self.worker_id);
        writer.set_counter(counter);
        writer.set_type(response_type);
        writer.set_payload_data(payload);
        writer.finalize()?;

        self.transport.transmit(writer.as_finalized()?)?;
        Ok(())
    }
}
