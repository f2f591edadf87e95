//! SIP protocol roles.
//!
//! The coordinator (flight computer side) sends requests and correlates
//! responses; workers (peripheral controllers) answer with their own id. A
//! dedicated receiver task feeds parsed response packets into the
//! coordinator's queue. Packets travel over any [`PacketTx`]/[`PacketRx`]
//! pair — in practice the framed transport, carrying exactly one packet
//! per frame.

pub mod coordinator;
pub mod packet_transport;
pub mod receiver;
pub mod worker;

pub use coordinator::{Coordinator, RequestError, ResponseData};
pub use packet_transport::{PacketRx, PacketTx};
pub use receiver::{CoordinatorPacketReceiver, ReceiveOutcome};
pub use worker::{Worker, WorkerError};
