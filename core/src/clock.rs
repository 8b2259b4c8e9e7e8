//! Time sources for circuit breaker timeouts
//!
//! This module provides different clock implementations:
//! - `MonotonicClock`: `Instant`-anchored seconds, immune to NTP clock skew
//! - `ManualClock`: externally driven time for tests and simulations

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of "now" for open timestamps and timeout checks
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in seconds relative to an arbitrary fixed origin
    fn now(&self) -> f64;
}

/// Monotonic clock anchored at creation time
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start_time: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// # Example
///
/// ```rust
/// use disyuntor::{Clock, ManualClock};
///
/// let clock = ManualClock::new(100.0);
/// clock.advance(5.0);
/// assert_eq!(clock.now(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    // f64 bits
    seconds: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            seconds: AtomicU64::new(start.to_bits()),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, seconds: f64) {
        self.seconds.store(seconds.to_bits(), Ordering::Release);
    }

    /// Move time forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        let mut current = self.seconds.load(Ordering::Acquire);

        loop {
            let next = (f64::from_bits(current) + seconds).to_bits();
            match self.seconds.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.seconds.load(Ordering::Acquire))
    }
}
