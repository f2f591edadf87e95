//! Interactive coordinator demo.
//!
//! Connects to a running worker demo and offers a tiny REPL: `cmd0` to
//! `cmd3` issue hardcoded requests, `quit` exits.

// interactive REPL: direct terminal output is the point here
#![allow(clippy::print_stdout)]

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sip_cli::TcpSerial;
use sip_codec::{HdlcDecoder, HdlcEncoder};
use sip_core::{Coordinator, CoordinatorPacketReceiver};
use sip_proto::params::WORST_CASE_FRAME_LENGTH;
use sip_time::{HeartbeatLimiter, HeartbeatSource, SystemClock, TracingHeartbeat};
use sip_transport::{FrameTransportRx, FrameTransportTx};

/// SIP coordinator demo over a TCP byte stream.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Worker address to connect to.
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    port: String,

    /// Worker id to address.
    #[arg(short, long, default_value_t = 1)]
    worker: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sip_cli::init_logging();
    let args = Args::parse();

    println!("SIP coordinator, connecting to {}", args.port);
    let link = TcpSerial::connect(&args.port)?;
    let clock = SystemClock::new();

    let tx = FrameTransportTx::new(link.try_clone()?, HdlcEncoder, WORST_CASE_FRAME_LENGTH);
    let coordinator = Arc::new(Coordinator::new(tx).with_response_timeout(Duration::from_secs(1)));

    let rx = FrameTransportRx::new(clock.clone(), link, HdlcDecoder::new(WORST_CASE_FRAME_LENGTH));
    let heartbeat =
        HeartbeatLimiter::new(clock, Duration::from_secs(5), HeartbeatSource(0), TracingHeartbeat);
    let mut receiver = CoordinatorPacketReceiver::new(rx, Arc::clone(&coordinator), heartbeat);
    std::thread::spawn(move || {
        loop {
            let _ = receiver.receive_packet(Duration::from_secs(1));
        }
    });

    println!("commands: cmd0 | cmd1 | cmd2 | cmd3 <byte> | quit");
    let mut counter: u8 = 0;
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        counter = counter.wrapping_add(1);

        let result = match command {
            "cmd0" => coordinator.send_request(args.worker, counter, 1, 2).map(|()| Vec::new()),
            "cmd1" => request_with_data(&coordinator, args.worker, counter, 3, 4, &[]),
            "cmd2" => request_with_data(&coordinator, args.worker, counter, 5, 6, &[0x12, 0x34]),
            "cmd3" => {
                let byte = parts.next().and_then(|raw| raw.parse::<u8>().ok()).unwrap_or(0);
                request_with_data(&coordinator, args.worker, counter, 7, 8, &[byte])
            }
            "quit" => break,
            "" => continue,
            unknown => {
                println!("unknown command: {unknown}");
                continue;
            }
        };

        match result {
            Ok(payload) if payload.is_empty() => println!("ok"),
            Ok(payload) => println!("ok, response payload: {payload:02X?}"),
            Err(error) => println!("request failed: {error}"),
        }
    }
    Ok(())
}

fn request_with_data<T: sip_core::PacketTx>(
    coordinator: &Coordinator<T>,
    worker: u8,
    counter: u8,
    request_type: u8,
    expected_response_type: u8,
    payload: &[u8],
) -> Result<Vec<u8>, sip_core::RequestError> {
    let mut response = [0_u8; sip_proto::params::MAX_PAYLOAD_LENGTH];
    let copied = coordinator.send_request_get_response_data(
        worker,
        counter,
        request_type,
        expected_response_type,
        payload,
        &mut response,
    )?;
    Ok(response[..copied].to_vec())
}
