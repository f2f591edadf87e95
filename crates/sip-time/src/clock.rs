//! Time sources for protocol logic.
//!
//! Decouples timing-sensitive code from system resources. Production code
//! uses [`SystemClock`]; tests use [`ManualClock`] which never waits on real
//! time and instead turns sleeps into jumps of the virtual clock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Effectively-infinite timeout sentinel.
///
/// Large enough that no realistic mission outlives it, small enough that
/// adding it to any clock reading cannot overflow a [`Duration`].
pub const FOREVER: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Monotonic time source.
///
/// `now()` reports the time elapsed since the clock's epoch (an arbitrary
/// fixed point, typically clock construction). Implementations MUST be
/// monotonic: subsequent calls return values >= previous calls within one
/// execution context.
///
/// `sleep()` is part of the trait so that test clocks can satisfy waiting
/// code without real delays.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current time as elapsed duration since the clock's epoch.
    fn now(&self) -> Duration;

    /// Suspends the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Production clock anchored to a [`std::time::Instant`] taken at creation.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is "now".
    #[must_use]
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Cloning yields a handle to the same underlying time; advancing one handle
/// is visible through all clones. `sleep()` advances the clock instead of
/// blocking, so polling loops driven by this clock terminate without wall
/// time passing.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    inner: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.saturating_add(delta);
    }

    /// Sets the clock to an absolute point. Must not move backwards.
    pub fn set(&self, now: Duration) {
        let mut current = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(now >= *current, "manual clock must be monotonic");
        *current = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
