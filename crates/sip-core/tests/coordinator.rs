//! Coordinator request/response behaviour over a scripted link.

use std::time::Duration;

use sip_codec::HdlcEncoder;
use sip_core::{Coordinator, RequestError, ResponseData};
use sip_harness::SerialStub;
use sip_proto::params::WORST_CASE_FRAME_LENGTH;
use sip_transport::FrameTransportTx;

type StubCoordinator = Coordinator<FrameTransportTx<SerialStub, HdlcEncoder>>;

fn coordinator(stub: &SerialStub) -> StubCoordinator {
    let tx = FrameTransportTx::new(stub.clone(), HdlcEncoder, WORST_CASE_FRAME_LENGTH);
    Coordinator::new(tx).with_response_timeout(Duration::from_millis(20))
}

fn response(worker_id: u8, counter: u8, packet_type: u8) -> ResponseData {
    ResponseData { length: 5, worker_id, counter, packet_type, ..ResponseData::default() }
}

#[test]
fn request_without_a_response_times_out() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    assert_eq!(coordinator.send_request(1, 2, 3, 4), Err(RequestError::Response));
    // the request itself still went out before the wait
    assert!(!stub.transmitted().is_empty());
}

#[test]
fn request_with_a_matching_response_succeeds() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    assert!(coordinator.enqueue_response(response(1, 2, 4)));
    assert_eq!(coordinator.send_request(1, 2, 3, 4), Ok(()));

    // the framed request on the wire, byte for byte
    assert_eq!(
        stub.transmitted(),
        vec![0x7E, 0x00, 0x05, 0x01, 0x02, 0x03, 0xCC, 0x78, 0x7E]
    );
}

#[test]
fn response_from_the_wrong_worker_is_reported() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    assert!(coordinator.enqueue_response(response(0, 2, 4)));
    assert_eq!(
        coordinator.send_request(1, 2, 3, 4),
        Err(RequestError::WorkerId { expected: 1, actual: 0 })
    );
}

#[test]
fn response_of_the_wrong_type_is_reported() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    assert!(coordinator.enqueue_response(response(1, 2, 0)));
    assert_eq!(
        coordinator.send_request(1, 2, 3, 4),
        Err(RequestError::ResponseType { expected: 4, actual: 0 })
    );
}

#[test]
fn request_with_payload_carries_it_on_the_wire() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    let mut reply = response(9, 4, 4);
    reply.payload[0] = 55;
    reply.payload_length = 1;
    assert!(coordinator.enqueue_response(reply));

    let mut response_buffer = [0_u8; 1];
    let copied = coordinator
        .send_request_get_response_data(9, 4, 9, 4, &[0x01, 0x02, 0x03, 0x04], &mut response_buffer)
        .unwrap();
    assert_eq!(copied, 1);
    assert_eq!(response_buffer[0], 55);

    let wire = stub.transmitted();
    assert_eq!(&wire[..10], &[0x7E, 0x00, 0x09, 0x09, 0x04, 0x09, 0x01, 0x02, 0x03, 0x04]);
    assert_eq!(wire.last(), Some(&0x7E));
}

#[test]
fn response_payload_must_fit_the_callers_buffer() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    let mut reply = response(1, 2, 4);
    reply.payload_length = 8;
    assert!(coordinator.enqueue_response(reply));

    let mut too_small = [0_u8; 4];
    assert_eq!(
        coordinator.send_request_get_response_data(1, 2, 3, 4, &[], &mut too_small),
        Err(RequestError::ResponseBufferTooSmall { payload: 8, buffer: 4 })
    );
}

#[test]
fn queue_overflow_drops_the_response() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    assert!(coordinator.enqueue_response(response(1, 2, 4)));
    // default depth is one: the second response is dropped, not overwritten
    assert!(!coordinator.enqueue_response(response(9, 9, 9)));

    assert_eq!(coordinator.send_request(1, 2, 3, 4), Ok(()));
}

#[test]
fn transmit_failure_is_surfaced() {
    let stub = SerialStub::new();
    stub.fail_writes();
    let coordinator = coordinator(&stub);

    assert!(matches!(
        coordinator.send_request(1, 2, 3, 4),
        Err(RequestError::Transmit(_))
    ));
}

#[test]
fn oversized_request_payload_fails_before_transmitting() {
    let stub = SerialStub::new();
    let coordinator = coordinator(&stub);

    let payload = vec![0_u8; sip_proto::params::MAX_PAYLOAD_LENGTH + 1];
    let mut out = [0_u8; 4];
    assert!(matches!(
        coordinator.send_request_get_response_data(1, 2, 3, 4, &payload, &mut out),
        Err(RequestError::Packet(_))
    ));
    assert!(stub.transmitted().is_empty());
}
