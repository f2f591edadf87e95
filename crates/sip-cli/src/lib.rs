//! Shared plumbing for the demo binaries.
//!
//! The demos speak SIP over a TCP connection standing in for the serial
//! link, so they can be tried on any machine with two terminals:
//!
//! ```text
//! sip-worker-demo --port 127.0.0.1:7878
//! sip-coordinator-demo --port 127.0.0.1:7878
//! ```

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use sip_transport::{SerialRx, SerialTx, StreamError};

/// TCP byte stream behind the serial contract.
///
/// Reads are bounded by the per-call timeout via the socket read timeout;
/// an expired timeout reports zero bytes, end-of-stream reports
/// [`StreamError::Closed`].
pub struct TcpSerial {
    stream: TcpStream,
}

impl TcpSerial {
    /// Wraps an established connection.
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Connects to `address`.
    pub fn connect(address: &str) -> Result<Self, StreamError> {
        Ok(Self::new(TcpStream::connect(address)?))
    }

    /// A second handle onto the same connection, so RX and TX halves can
    /// be owned independently.
    pub fn try_clone(&self) -> Result<Self, StreamError> {
        Ok(Self::new(self.stream.try_clone()?))
    }
}

impl SerialRx for TcpSerial {
    fn read(&mut self, dst: &mut [u8], timeout: Duration) -> Result<usize, StreamError> {
        // a zero socket timeout would mean "block forever"
        let bounded = timeout.max(Duration::from_millis(1));
        self.stream.set_read_timeout(Some(bounded))?;
        match self.stream.read(dst) {
            Ok(0) => Err(StreamError::Closed),
            Ok(count) => Ok(count),
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(0)
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl SerialTx for TcpSerial {
    fn write(&mut self, src: &[u8], _timeout: Duration) -> Result<usize, StreamError> {
        match self.stream.write(src) {
            Ok(0) => Err(StreamError::Closed),
            Ok(count) => Ok(count),
            Err(error) => Err(error.into()),
        }
    }
}

/// Installs the demo log subscriber (`RUST_LOG` controlled).
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
