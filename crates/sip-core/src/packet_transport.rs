//! Packet-level transport interface.
//!
//! SIP puts exactly one packet in each frame, so the packet transport is
//! the framed transport seen through a narrower, role-appropriate
//! interface: the coordinator and workers share a [`PacketTx`], while a
//! receiver task exclusively owns its [`PacketRx`].

use std::time::Duration;

use sip_codec::{BufferedFrameDecoder, FrameEncoder};
use sip_time::Clock;
use sip_transport::{FrameTransportRx, FrameTransportTx, SerialRx, SerialTx, TransportError};

/// Sends one packet per call; safe to share between threads.
pub trait PacketTx: Send + Sync {
    /// Transmits `packet`; returns the bytes put on the wire.
    fn transmit(&self, packet: &[u8]) -> Result<usize, TransportError>;
}

/// Receives one packet per call; single-owner.
pub trait PacketRx {
    /// Receives the next packet into `out`, waiting at most `timeout`.
    fn receive<'a>(&mut self, out: &'a mut [u8], timeout: Duration)
    -> Result<&'a [u8], TransportError>;
}

impl<S, E> PacketTx for FrameTransportTx<S, E>
where
    S: SerialTx + Send,
    E: FrameEncoder + Send,
{
    fn transmit(&self, packet: &[u8]) -> Result<usize, TransportError> {
        Self::transmit(self, packet)
    }
}

impl<C, S, D> PacketRx for FrameTransportRx<C, S, D>
where
    C: Clock,
    S: SerialRx,
    D: BufferedFrameDecoder,
{
    fn receive<'a>(
        &mut self,
        out: &'a mut [u8],
        timeout: Duration,
    ) -> Result<&'a [u8], TransportError> {
        Self::receive(self, out, timeout)
    }
}
