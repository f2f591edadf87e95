//! Clock abstraction and timing primitives.
//!
//! All blocking operations in the SIP stack take finite timeouts and read
//! time through an injected [`Clock`]. This crate provides the clock trait,
//! a monotonic production clock, a manually advanced test clock, a polling
//! [`Timeout`], rate-limiting [`quota`]s and the heartbeat support used by
//! the long-running receiver loops.

pub mod clock;
pub mod heartbeat;
pub mod quota;
pub mod timeout;

pub use clock::{Clock, FOREVER, ManualClock, SystemClock};
pub use heartbeat::{Heartbeat, HeartbeatLimiter, HeartbeatSink, HeartbeatSource, TracingHeartbeat};
pub use quota::{ContinuousIntervalQuota, NonDeterministicIntervalQuota, Quota, UnlimitedQuota};
pub use timeout::{Timeout, TimeoutState};
