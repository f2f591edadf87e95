//! Full-stack exchange over a real TCP loopback connection.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use sip_cli::TcpSerial;
use sip_codec::{HdlcDecoder, HdlcEncoder};
use sip_core::{Coordinator, CoordinatorPacketReceiver, Worker};
use sip_proto::PacketReader;
use sip_proto::params::{MAX_PACKET_LENGTH, WORST_CASE_FRAME_LENGTH};
use sip_time::{HeartbeatLimiter, HeartbeatSource, SystemClock, TracingHeartbeat};
use sip_transport::{FrameTransportRx, FrameTransportTx};

#[test]
fn coordinator_and_worker_exchange_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let address = listener.local_addr().expect("local addr").to_string();

    // worker side: answer every type-3 request with a type-4 echo
    let worker_thread = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let link = TcpSerial::new(stream);
        let tx =
            FrameTransportTx::new(link.try_clone().expect("clone"), HdlcEncoder, WORST_CASE_FRAME_LENGTH);
        let worker = Worker::new(1, tx);
        let mut rx = FrameTransportRx::new(
            SystemClock::new(),
            link,
            HdlcDecoder::new(WORST_CASE_FRAME_LENGTH),
        )
        .with_wait_for_data_sleep_time(Duration::from_millis(1));

        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let frame = rx.receive(&mut buffer, Duration::from_secs(5)).expect("request frame");
        let request = PacketReader::read_packet(frame).expect("request packet");
        assert_eq!(request.worker_id(), 1);
        assert_eq!(request.packet_type(), 3);

        worker
            .send_response_with_payload(request.counter(), 4, request.payload())
            .expect("response sent");
    });

    // coordinator side
    let link = TcpSerial::connect(&address).expect("connect");
    let clock = SystemClock::new();
    let tx =
        FrameTransportTx::new(link.try_clone().expect("clone"), HdlcEncoder, WORST_CASE_FRAME_LENGTH);
    let coordinator = Arc::new(Coordinator::new(tx).with_response_timeout(Duration::from_secs(5)));

    let rx = FrameTransportRx::new(clock.clone(), link, HdlcDecoder::new(WORST_CASE_FRAME_LENGTH))
        .with_wait_for_data_sleep_time(Duration::from_millis(1));
    let heartbeat =
        HeartbeatLimiter::new(clock, Duration::from_secs(5), HeartbeatSource(0), TracingHeartbeat);
    let mut receiver = CoordinatorPacketReceiver::new(rx, Arc::clone(&coordinator), heartbeat);
    let receiver_thread = std::thread::spawn(move || {
        for _ in 0..50 {
            if receiver.receive_packet(Duration::from_millis(200)) == sip_core::ReceiveOutcome::Success
            {
                break;
            }
        }
    });

    let mut response = [0_u8; 16];
    let copied = coordinator
        .send_request_get_response_data(1, 7, 3, 4, &[0xAB, 0xCD], &mut response)
        .expect("request answered");
    assert_eq!(copied, 2);
    assert_eq!(&response[..2], &[0xAB, 0xCD]);

    worker_thread.join().expect("worker thread");
    receiver_thread.join().expect("receiver thread");
}
