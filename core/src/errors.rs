//! Error types for circuit breaker operations

use crate::State;
use thiserror::Error;

/// Errors returned from [`Breaker::attempt`](crate::Breaker::attempt)
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// Circuit is open, the protected operation was not attempted
    #[error("circuit '{circuit}' is open (opened at {opened_at})")]
    Open { circuit: String, opened_at: f64 },
    /// The protected operation ran and failed
    #[error("circuit execution failed: {0}")]
    Execution(#[source] E),
}

impl<E> CircuitError<E> {
    /// True when the breaker refused to call the operation
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    /// The operation's own error, if the operation ran
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            CircuitError::Open { .. } => None,
        }
    }
}

/// Invalid breaker configuration, reported at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failure threshold must be greater than 0")]
    InvalidThreshold,
    #[error("timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(f64),
}

/// A manual transition the circuit's current state does not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {event} circuit '{circuit}' while {from}")]
pub struct TransitionError {
    pub circuit: String,
    pub event: &'static str,
    pub from: State,
}
