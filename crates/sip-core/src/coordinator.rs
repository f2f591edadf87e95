//! Request/response coordinator.

use std::time::Duration;

use sip_container::ReferenceQueue;
use sip_proto::params::{MAX_PACKET_LENGTH, MAX_PAYLOAD_LENGTH, RESPONSE_QUEUE_DEPTH, RESPONSE_TIMEOUT};
use sip_proto::{PacketError, PacketReader, PacketWriter};
use sip_transport::TransportError;
use thiserror::Error;

use crate::packet_transport::PacketTx;

/// Errors surfaced to the application by a coordinator request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// The request packet could not be built.
    #[error("request packet could not be built: {0}")]
    Packet(#[from] PacketError),

    /// The request could not be transmitted.
    #[error("request transmit failed: {0}")]
    Transmit(#[from] TransportError),

    /// No response arrived within the configured response timeout.
    #[error("no response within the response timeout")]
    Response,

    /// A response arrived, but from the wrong worker.
    #[error("response from worker {actual}, expected worker {expected}")]
    WorkerId {
        /// Worker the request was addressed to.
        expected: u8,
        /// Worker the response claims to come from.
        actual: u8,
    },

    /// A response arrived, but with an unexpected type.
    #[error("response type {actual:#04x}, expected {expected:#04x}")]
    ResponseType {
        /// Type the caller expected.
        expected: u8,
        /// Type the response carried.
        actual: u8,
    },

    /// The response payload does not fit the caller's buffer.
    #[error("response payload of {payload} bytes exceeds the {buffer}-byte buffer")]
    ResponseBufferTooSmall {
        /// Received payload length.
        payload: usize,
        /// Provided buffer length.
        buffer: usize,
    },
}

/// Parsed response packet as carried through the coordinator's queue.
#[derive(Debug, Clone)]
pub struct ResponseData {
    /// Value of the packet's length field.
    pub length: u16,
    /// Responding worker.
    pub worker_id: u8,
    /// Echoed correlation counter.
    pub counter: u8,
    /// Response type.
    pub packet_type: u8,
    /// Valid bytes in `payload`.
    pub payload_length: usize,
    /// Payload bytes, truncated to the protocol maximum.
    pub payload: [u8; MAX_PAYLOAD_LENGTH],
}

impl Default for ResponseData {
    fn default() -> Self {
        Self {
            length: 0,
            worker_id: 0,
            counter: 0,
            packet_type: 0,
            payload_length: 0,
            payload: [0; MAX_PAYLOAD_LENGTH],
        }
    }
}

impl From<&PacketReader<'_>> for ResponseData {
    fn from(reader: &PacketReader<'_>) -> Self {
        let mut response = Self {
            length: reader.length(),
            worker_id: reader.worker_id(),
            counter: reader.counter(),
            packet_type: reader.packet_type(),
            ..Self::default()
        };
        let payload = reader.payload();
        let length = payload.len().min(MAX_PAYLOAD_LENGTH);
        response.payload[..length].copy_from_slice(&payload[..length]);
        response.payload_length = length;
        response
    }
}

/// Initiator of SIP requests.
///
/// Owns the bounded response queue fed by the
/// [receiver task](crate::receiver::CoordinatorPacketReceiver). One
/// outstanding request at a time per instance; callers needing interleaved
/// requests must serialise them.
///
/// Correlation is by `(worker id, expected response type)` against the next
/// queued response: with a single outstanding request and a FIFO queue, the
/// very next response is either the expected one or a protocol violation to
/// be surfaced.
pub struct Coordinator<T: PacketTx> {
    transport: T,
    response_queue: ReferenceQueue<ResponseData>,
    response_timeout: Duration,
}

impl<T: PacketTx> Coordinator<T> {
    /// Creates a coordinator with the default response timeout and queue
    /// depth.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            response_queue: ReferenceQueue::new(RESPONSE_QUEUE_DEPTH),
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    /// Overrides the response timeout.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Overrides the response queue depth.
    #[must_use]
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.response_queue = ReferenceQueue::new(depth);
        self
    }

    /// Sends a payload-free request and awaits a payload-free response.
    pub fn send_request(
        &self,
        worker_id: u8,
        counter: u8,
        request_type: u8,
        expected_response_type: u8,
    ) -> Result<(), RequestError> {
        self.request(worker_id, counter, request_type, expected_response_type, &[], None)
            .map(|_| ())
    }

    /// Sends a request and copies the response payload into
    /// `response_buffer`; returns the copied length.
    pub fn send_request_get_response_data(
        &self,
        worker_id: u8,
        counter: u8,
        request_type: u8,
        expected_response_type: u8,
        request_payload: &[u8],
        response_buffer: &mut [u8],
    ) -> Result<usize, RequestError> {
        self.request(
            worker_id,
            counter,
            request_type,
            expected_response_type,
            request_payload,
            Some(response_buffer),
        )
    }

    /// Ingestion point for the receiver task: enqueues one parsed response.
    ///
    /// Returns `false` when the queue is full; the response is dropped, not
    /// overwritten.
    pub fn enqueue_response(&self, response: ResponseData) -> bool {
        self.response_queue.send(response, Duration::ZERO).is_ok()
    }

    fn request(
        &self,
        worker_id: u8,
        counter: u8,
        request_type: u8,
        expected_response_type: u8,
        request_payload: &[u8],
        response_buffer: Option<&mut [u8]>,
    ) -> Result<usize, RequestError> {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let mut writer = PacketWriter::new(&mut buffer);
        writer.set_worker_id(worker_id);
        writer.set_counter(counter);
        writer.set_type(request_type);
        writer.set_payload_data(request_payload);
        writer.finalize()?;

        self.transport.transmit(writer.as_finalized()?)?;

        let response = self
            .response_queue
            .receive(self.response_timeout)
            .map_err(|_| RequestError::Response)?;

        if response.worker_id != worker_id {
            tracing::debug!(expected = worker_id, actual = response.worker_id, "worker id mismatch");
            return Err(RequestError::WorkerId { expected: worker_id, actual: response.worker_id });
        }
        if response.packet_type != expected_response_type {
            tracing::debug!(
                expected = expected_response_type,
                actual = response.packet_type,
                "response type mismatch"
            );
            return Err(RequestError::ResponseType {
                expected: expected_response_type,
                actual: response.packet_type,
            });
        }

        let Some(out) = response_buffer else {
            return Ok(0);
        };
        if out.len() < response.payload_length {
            return Err(RequestError::ResponseBufferTooSmall {
                payload: response.payload_length,
                buffer: out.len(),
            });
        }
        out[..response.payload_length].copy_from_slice(&response.payload[..response.payload_length]);
        Ok(response.payload_length)
    }
}
