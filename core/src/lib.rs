//! Disyuntor - a circuit breaker with a counted-failure policy
//!
//! The breaker wraps calls to an unreliable dependency:
//! - Closed: calls pass through, consecutive failures are counted
//! - Open: after `threshold` failures calls are rejected without running
//! - HalfOpen: once `timeout` has elapsed the next call is a trial; success
//!   closes the circuit, failure re-opens it
//!
//! # Example
//!
//! ```rust
//! use disyuntor::{Breaker, CircuitError};
//!
//! let breaker: Breaker<u32, String> = Breaker::builder("inventory")
//!     .threshold(3)
//!     .timeout_secs(10.0)
//!     .on_open(|name| eprintln!("circuit {name} opened"))
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..3 {
//!     let _ = breaker.attempt(|| Err("connection reset".to_string()));
//! }
//!
//! // Rejected without calling the dependency
//! match breaker.attempt(|| Ok(42)) {
//!     Err(CircuitError::Open { circuit, .. }) => assert_eq!(circuit, "inventory"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod clock;
pub mod errors;

pub use builder::BreakerBuilder;
pub use callbacks::Callbacks;
pub use circuit::{Breaker, Config, OpenContext, OpenHandler};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use errors::{CircuitError, ConfigError, TransitionError};

use std::fmt;

/// Circuit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
