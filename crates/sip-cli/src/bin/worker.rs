//! Worker demo.
//!
//! Listens for one coordinator connection and answers the demo request
//! types: every request `t` gets a response of type `t + 1`, echoing the
//! request payload.

// demo prints a table of received packets
#![allow(clippy::print_stdout)]

use std::net::TcpListener;
use std::time::Duration;

use clap::Parser;
use sip_cli::TcpSerial;
use sip_codec::{HdlcDecoder, HdlcEncoder};
use sip_core::Worker;
use sip_proto::PacketReader;
use sip_proto::params::{MAX_PACKET_LENGTH, WORST_CASE_FRAME_LENGTH};
use sip_time::SystemClock;
use sip_transport::{FrameTransportRx, FrameTransportTx, TransportError};

/// SIP worker demo over a TCP byte stream.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    port: String,

    /// This worker's id.
    #[arg(short, long, default_value_t = 1)]
    worker: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sip_cli::init_logging();
    let args = Args::parse();

    let listener = TcpListener::bind(&args.port)?;
    println!("SIP worker {} listening on {}", args.worker, args.port);
    let (stream, peer) = listener.accept()?;
    println!("coordinator connected from {peer}");

    let link = TcpSerial::new(stream);
    let tx = FrameTransportTx::new(link.try_clone()?, HdlcEncoder, WORST_CASE_FRAME_LENGTH);
    let worker = Worker::new(args.worker, tx);
    let mut rx = FrameTransportRx::new(
        SystemClock::new(),
        link,
        HdlcDecoder::new(WORST_CASE_FRAME_LENGTH),
    );

    println!("{:>8} {:>8} {:>6} {:>8}", "worker", "counter", "type", "payload");
    loop {
        let mut buffer = [0_u8; MAX_PACKET_LENGTH];
        let frame = match rx.receive(&mut buffer, Duration::from_secs(1)) {
            Ok(frame) => frame,
            Err(TransportError::Timeout) => continue,
            Err(TransportError::StreamStopped) => {
                println!("coordinator disconnected");
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(%error, "dropping undecodable frame");
                continue;
            }
        };

        let packet = match PacketReader::read_packet(frame) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(%error, "dropping invalid packet");
                continue;
            }
        };

        println!(
            "{:>8} {:>8} {:>6} {:>8}",
            packet.worker_id(),
            packet.counter(),
            packet.packet_type(),
            format!("{:02X?}", packet.payload()),
        );

        if packet.worker_id() != args.worker {
            tracing::debug!(addressed = packet.worker_id(), "request for a different worker");
            continue;
        }

        let response_type = packet.packet_type().wrapping_add(1);
        let result = if packet.payload().is_empty() {
            worker.send_response(packet.counter(), response_type)
        } else {
            worker.send_response_with_payload(packet.counter(), response_type, packet.payload())
        };
        if let Err(error) = result {
            tracing::warn!(%error, "response transmission failed");
        }
    }
}
