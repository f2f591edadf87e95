//! Scripted in-memory byte stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sip_transport::{SerialRx, SerialTx, StreamError};

#[derive(Default)]
struct StubState {
    to_receive: VecDeque<u8>,
    transmitted: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Scripted serial link for tests.
///
/// Cloning yields another handle to the same link, so one clone can act as
/// the RX half and another as the TX half of a transport. Reads never
/// block: when the scripted data is exhausted they report a timeout
/// immediately (`Ok(0)`), which keeps tests driven by a manual clock
/// deterministic.
#[derive(Clone, Default)]
pub struct SerialStub {
    state: Arc<Mutex<StubState>>,
}

impl SerialStub {
    /// Creates an empty stub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues bytes the next reads will deliver.
    pub fn push_receive_data(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.to_receive.extend(data.iter().copied());
    }

    /// Everything written to the stub so far.
    #[must_use]
    pub fn transmitted(&self) -> Vec<u8> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).transmitted.clone()
    }

    /// Forgets captured transmit data and pending receive data.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.to_receive.clear();
        state.transmitted.clear();
    }

    /// Makes subsequent reads fail permanently.
    pub fn fail_reads(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).fail_reads = true;
    }

    /// Makes subsequent writes fail permanently.
    pub fn fail_writes(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).fail_writes = true;
    }
}

impl SerialRx for SerialStub {
    fn read(&mut self, dst: &mut [u8], _timeout: Duration) -> Result<usize, StreamError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.fail_reads {
            return Err(StreamError::Closed);
        }
        let mut count = 0;
        while count < dst.len() {
            let Some(byte) = state.to_receive.pop_front() else {
                break;
            };
            dst[count] = byte;
            count += 1;
        }
        Ok(count)
    }
}

impl SerialTx for SerialStub {
    fn write(&mut self, src: &[u8], _timeout: Duration) -> Result<usize, StreamError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.fail_writes {
            return Err(StreamError::Closed);
        }
        state.transmitted.extend_from_slice(src);
        Ok(src.len())
    }
}
