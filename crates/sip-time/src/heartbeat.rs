//! Thread heartbeat support.
//!
//! Long-running loops (packet receivers, bus workers) report liveness by
//! emitting heartbeat ticks. A supervisor watches the ticks to detect dead
//! or wedged threads. The [`HeartbeatLimiter`] keeps tick traffic down to
//! one per interval while still reporting early when a loop's deadline
//! shrinks significantly.

use std::time::Duration;

use crate::clock::Clock;

/// Default slack added on top of every reported deadline.
pub const HEARTBEAT_TOLERANCE: Duration = Duration::from_millis(100);

/// Identifies the thread a heartbeat tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeartbeatSource(pub u16);

/// One liveness tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Reporting thread.
    pub source: HeartbeatSource,
    /// Absolute time (since the clock's epoch) by which the next tick will
    /// arrive. Missing this deadline means the thread is presumed dead.
    pub deadline: Duration,
}

/// Receiver side of heartbeat ticks.
pub trait HeartbeatSink: Send + Sync {
    /// Delivers one tick.
    fn tick(&self, heartbeat: Heartbeat);
}

impl<F> HeartbeatSink for F
where
    F: Fn(Heartbeat) + Send + Sync,
{
    fn tick(&self, heartbeat: Heartbeat) {
        self(heartbeat);
    }
}

/// Sink that records ticks in the trace log.
#[derive(Debug, Default)]
pub struct TracingHeartbeat;

impl HeartbeatSink for TracingHeartbeat {
    fn tick(&self, heartbeat: Heartbeat) {
        tracing::trace!(source = heartbeat.source.0, deadline_ms = heartbeat.deadline.as_millis() as u64, "heartbeat");
    }
}

/// Emits at most one heartbeat per interval.
///
/// Intended for loops that process many short work items: call
/// [`HeartbeatLimiter::send`] after every item and the limiter decides when
/// a tick actually goes out. A tick is emitted when the previous deadline
/// comes within reach of the current work item, or when the requested
/// processing timeout shrank so much that the old deadline is far too lax.
pub struct HeartbeatLimiter<C: Clock, S: HeartbeatSink> {
    clock: C,
    interval: Duration,
    tolerance: Duration,
    source: HeartbeatSource,
    sink: S,
    deadline: Duration,
}

impl<C: Clock, S: HeartbeatSink> HeartbeatLimiter<C, S> {
    /// Creates a limiter emitting for `source` at most once per `interval`.
    pub fn new(clock: C, interval: Duration, source: HeartbeatSource, sink: S) -> Self {
        Self { clock, interval, tolerance: HEARTBEAT_TOLERANCE, source, sink, deadline: Duration::ZERO }
    }

    /// Overrides the deadline slack.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reports one processing step bounded by `processing_timeout`.
    ///
    /// Emits a tick when necessary, otherwise does nothing.
    pub fn send(&mut self, processing_timeout: Duration) {
        let now = self.clock.now();
        let timeout = self.interval.saturating_add(processing_timeout).saturating_add(self.tolerance);

        let due = self.deadline <= now.saturating_add(processing_timeout).saturating_add(self.tolerance);
        let too_lax = self.deadline > now.saturating_add(timeout);
        if due || too_lax {
            self.deadline = now.saturating_add(timeout);
            self.sink.tick(Heartbeat { source: self.source, deadline: self.deadline });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::clock::ManualClock;

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        ticks: Arc<Mutex<Vec<Heartbeat>>>,
    }

    impl HeartbeatSink for RecordingSink {
        fn tick(&self, heartbeat: Heartbeat) {
            self.ticks.lock().unwrap().push(heartbeat);
        }
    }

    #[test]
    fn first_send_always_ticks() {
        let sink = RecordingSink::default();
        let mut limiter =
            HeartbeatLimiter::new(ManualClock::new(), millis(1000), HeartbeatSource(7), sink.clone())
                .with_tolerance(millis(0));

        limiter.send(millis(10));
        let ticks = sink.ticks.lock().unwrap();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].source, HeartbeatSource(7));
        assert_eq!(ticks[0].deadline, millis(1010));
    }

    #[test]
    fn sends_within_the_interval_are_suppressed() {
        let clock = ManualClock::new();
        let sink = RecordingSink::default();
        let mut limiter =
            HeartbeatLimiter::new(clock.clone(), millis(1000), HeartbeatSource(1), sink.clone())
                .with_tolerance(millis(0));

        limiter.send(millis(10));
        for _ in 0..150 {
            clock.advance(millis(10));
            limiter.send(millis(10));
        }
        // one initial tick, then one more once the deadline came within reach
        // around t = 1000
        let count = sink.ticks.lock().unwrap().len();
        assert_eq!(count, 2);
    }

    #[test]
    fn shrinking_processing_timeout_reemits_early() {
        let clock = ManualClock::new();
        let sink = RecordingSink::default();
        let mut limiter =
            HeartbeatLimiter::new(clock.clone(), millis(100), HeartbeatSource(1), sink.clone())
                .with_tolerance(millis(0));

        limiter.send(millis(10_000));
        clock.advance(millis(10));
        // deadline sits at ~10100 but the loop now promises 10ms steps; the
        // stale deadline is far too lax and must be replaced
        limiter.send(millis(10));

        let ticks = sink.ticks.lock().unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].deadline, millis(120));
    }
}
