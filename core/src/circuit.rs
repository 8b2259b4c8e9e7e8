//! Circuit breaker implementation using state machines
//!
//! This module provides the breaker's state machine, its counted-failure
//! policy and the timeout-driven recovery probe.

use crate::{
    State,
    builder::BreakerBuilder,
    callbacks::{Callbacks, Transition},
    clock::{Clock, MonotonicClock},
    errors::{CircuitError, ConfigError, TransitionError},
};
use state_machines::state_machine;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Consecutive failures tolerated while Closed before the circuit trips
    pub threshold: usize,

    /// Seconds the circuit stays Open before a trial call is let through
    pub timeout_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout_secs: 10.0,
        }
    }
}

impl Config {
    /// Reject a zero threshold and timeouts that are not finite and positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }
        Ok(())
    }
}

/// Snapshot of the breaker handed to the open-circuit handler
#[derive(Debug, Clone)]
pub struct OpenContext {
    /// Circuit name
    pub circuit_name: String,
    /// Time at which the circuit last opened
    pub opened_at: f64,
    /// Failure count when the call was rejected
    pub failures: usize,
    /// Failures that open the circuit
    pub threshold: usize,
    /// Seconds before the next trial call
    pub timeout_secs: f64,
}

/// Called in place of the protected operation while the circuit is open
pub type OpenHandler<T, E> = Arc<dyn Fn(&OpenContext) -> Result<T, CircuitError<E>> + Send + Sync>;

fn default_open_handler<T: 'static, E: 'static>() -> OpenHandler<T, E> {
    Arc::new(|ctx: &OpenContext| {
        Err(CircuitError::Open {
            circuit: ctx.circuit_name.clone(),
            opened_at: ctx.opened_at,
        })
    })
}

/// Circuit breaker context - shared data across all states
#[derive(Debug, Clone, Default)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    pub opened_at: f64,
}

// `attempt_reset` is the Open -> HalfOpen probe. Everything not listed here
// is rejected by the machine.
state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen,
    ],
    events {
        trip {
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        reset {
            transition: { from: [Closed, HalfOpen], to: Closed }
        }
        attempt_reset {
            transition: { from: Open, to: HalfOpen }
        }
    }
}

fn state_from_name(name: &str) -> State {
    match name {
        "Closed" => State::Closed,
        "Open" => State::Open,
        "HalfOpen" => State::HalfOpen,
        other => unreachable!("invalid circuit state: {other}"),
    }
}

/// State machine plus failure count, always mutated under one lock
struct Bookkeeping {
    machine: DynamicCircuit,
    failures: usize,
}

impl Bookkeeping {
    fn new(context: CircuitContext) -> Self {
        Self {
            machine: DynamicCircuit::new(context),
            failures: 0,
        }
    }

    fn state(&self) -> State {
        state_from_name(self.machine.current_state())
    }

    fn opened_at(&self) -> Option<f64> {
        self.machine.open_data().map(|data| data.opened_at)
    }

    fn timed_out(&self, now: f64, timeout_secs: f64) -> bool {
        self.opened_at()
            .is_some_and(|opened_at| now > opened_at + timeout_secs)
    }

    fn fire(&mut self, event: CircuitEvent, label: &str) {
        let from = self.machine.current_state();
        if self.machine.handle(event).is_err() {
            panic!("illegal circuit transition '{label}' from {from}");
        }
    }

    /// Trip if the table allows it from the current state
    fn try_trip(&mut self, now: f64) -> bool {
        if self.machine.handle(CircuitEvent::Trip).is_err() {
            return false;
        }
        if let Some(data) = self.machine.open_data_mut() {
            data.opened_at = now;
        }
        true
    }

    /// Reset if the table allows it from the current state
    fn try_reset(&mut self) -> bool {
        if self.machine.handle(CircuitEvent::Reset).is_err() {
            return false;
        }
        self.failures = 0;
        true
    }

    fn trip(&mut self, now: f64) {
        if !self.try_trip(now) {
            panic!("illegal circuit transition 'trip' from {}", self.machine.current_state());
        }
    }

    fn reset(&mut self) {
        if !self.try_reset() {
            panic!("illegal circuit transition 'reset' from {}", self.machine.current_state());
        }
    }

    fn attempt_reset(&mut self) {
        self.fire(CircuitEvent::AttemptReset, "attempt_reset");
    }

    // The lock is released while the operation runs, so the outcome is applied
    // to whatever state the circuit is in now, not the one it was dispatched in.

    fn record_success(&mut self, ctx: &CircuitContext) -> Option<Transition> {
        match self.state() {
            State::Closed => {
                self.reset();
                None
            }
            State::HalfOpen => {
                self.reset();
                tracing::info!(circuit = %ctx.name, "circuit closed, probe succeeded");
                Some(Transition::Closed)
            }
            State::Open => {
                tracing::debug!(circuit = %ctx.name, "circuit opened while call was in flight");
                None
            }
        }
    }

    fn record_failure(&mut self, ctx: &CircuitContext, now: f64) -> Option<Transition> {
        match self.state() {
            State::Closed => {
                self.failures += 1;
                if self.failures < ctx.config.threshold {
                    return None;
                }
                self.trip(now);
                tracing::warn!(
                    circuit = %ctx.name,
                    failures = self.failures,
                    threshold = ctx.config.threshold,
                    "circuit opened due to failures"
                );
                Some(Transition::Opened)
            }
            State::HalfOpen => {
                self.failures += 1;
                self.trip(now);
                tracing::warn!(
                    circuit = %ctx.name,
                    failures = self.failures,
                    "circuit re-opened, probe failed"
                );
                Some(Transition::Opened)
            }
            State::Open => {
                tracing::debug!(circuit = %ctx.name, "circuit opened while call was in flight");
                None
            }
        }
    }
}

enum Dispatch {
    Call(Option<Transition>),
    Reject(OpenContext),
}

/// Circuit breaker public API
///
/// `T` and `E` are the protected operation's success and error types. The
/// breaker is `Sync`; share one instance per guarded dependency behind an
/// `Arc`.
pub struct Breaker<T, E> {
    context: CircuitContext,
    inner: Mutex<Bookkeeping>,
    clock: Arc<dyn Clock>,
    open_handler: RwLock<OpenHandler<T, E>>,
    callbacks: Callbacks,
}

impl<T: 'static, E: 'static> Breaker<T, E> {
    /// Create a breaker that trips after `threshold` consecutive failures and
    /// probes again `timeout_secs` after opening
    pub fn new(threshold: usize, timeout_secs: f64) -> Result<Self, ConfigError> {
        Self::with_config(Config {
            threshold,
            timeout_secs,
        })
    }

    /// Create an unnamed breaker from a validated [`Config`]
    pub fn with_config(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let context = CircuitContext {
            name: String::new(),
            config,
        };
        Ok(Self::from_parts(
            context,
            Arc::new(MonotonicClock::new()),
            None,
            Callbacks::new(),
        ))
    }

    /// Create a new breaker builder
    pub fn builder(name: impl Into<String>) -> BreakerBuilder<T, E> {
        BreakerBuilder::new(name)
    }

    pub(crate) fn from_parts(
        context: CircuitContext,
        clock: Arc<dyn Clock>,
        open_handler: Option<OpenHandler<T, E>>,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            inner: Mutex::new(Bookkeeping::new(context.clone())),
            context,
            clock,
            open_handler: RwLock::new(open_handler.unwrap_or_else(default_open_handler)),
            callbacks,
        }
    }
}

impl<T, E> Breaker<T, E> {
    /// Replace the handler invoked while the circuit is open
    ///
    /// Without one, rejected calls fail with [`CircuitError::Open`]. Calls
    /// already rejected keep the handler they picked up.
    pub fn register_open_handler<F>(&self, handler: F)
    where
        F: Fn(&OpenContext) -> Result<T, CircuitError<E>> + Send + Sync + 'static,
    {
        *self
            .open_handler
            .write()
            .expect("open handler lock poisoned") = Arc::new(handler);
    }

    /// Force the circuit open, stamping `opened_at` with the current time
    ///
    /// Fails if the circuit is already Open.
    pub fn trip(&self) -> Result<(), TransitionError> {
        let now = self.clock.now();
        {
            let mut inner = self.lock();
            let from = inner.state();
            if !inner.try_trip(now) {
                return Err(self.transition_error("trip", from));
            }
            tracing::warn!(circuit = %self.context.name, failures = inner.failures, "circuit opened manually");
        }
        self.notify(Some(Transition::Opened));
        Ok(())
    }

    /// Force the circuit closed and clear the failure count
    ///
    /// Allowed from Closed and HalfOpen. An Open circuit rejects the reset;
    /// it only closes through a successful trial call.
    pub fn reset(&self) -> Result<(), TransitionError> {
        let transition = {
            let mut inner = self.lock();
            let from = inner.state();
            if !inner.try_reset() {
                return Err(self.transition_error("reset", from));
            }
            tracing::info!(circuit = %self.context.name, "circuit reset manually");
            (from == State::HalfOpen).then_some(Transition::Closed)
        };
        self.notify(transition);
        Ok(())
    }

    fn transition_error(&self, event: &'static str, from: State) -> TransitionError {
        TransitionError {
            circuit: self.context.name.clone(),
            event,
            from,
        }
    }

    /// Execute `operation` under the breaker's policy
    ///
    /// Closed or HalfOpen: the operation runs and its error, if any, is
    /// counted and returned as [`CircuitError::Execution`]. Open: the
    /// operation is skipped and the open handler's outcome is returned. An
    /// Open circuit whose timeout has elapsed moves to HalfOpen first.
    pub fn attempt<F>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let probe = match self.dispatch() {
            Dispatch::Reject(ctx) => {
                tracing::debug!(circuit = %self.context.name, "circuit open, call rejected");
                let handler = self
                    .open_handler
                    .read()
                    .expect("open handler lock poisoned")
                    .clone();
                return handler(&ctx);
            }
            Dispatch::Call(probe) => probe,
        };
        self.notify(probe);

        match operation() {
            Ok(value) => {
                let transition = self.lock().record_success(&self.context);
                self.notify(transition);
                Ok(value)
            }
            Err(e) => {
                let now = self.clock.now();
                let transition = self.lock().record_failure(&self.context, now);
                self.notify(transition);
                Err(CircuitError::Execution(e))
            }
        }
    }

    fn dispatch(&self) -> Dispatch {
        let now = self.clock.now();
        let mut inner = self.lock();

        let probe = if inner.timed_out(now, self.context.config.timeout_secs) {
            inner.attempt_reset();
            tracing::info!(circuit = %self.context.name, "circuit half-open, testing recovery");
            Some(Transition::HalfOpened)
        } else {
            None
        };

        match inner.state() {
            State::Closed | State::HalfOpen => Dispatch::Call(probe),
            State::Open => Dispatch::Reject(OpenContext {
                circuit_name: self.context.name.clone(),
                opened_at: inner.opened_at().unwrap_or(0.0),
                failures: inner.failures,
                threshold: self.context.config.threshold,
                timeout_secs: self.context.config.timeout_secs,
            }),
        }
    }

    fn notify(&self, transition: Option<Transition>) {
        if let Some(transition) = transition {
            self.callbacks.notify(&self.context.name, transition);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Bookkeeping> {
        self.inner
            .lock()
            .expect("circuit bookkeeping lock poisoned")
    }

    /// Current state
    pub fn state(&self) -> State {
        self.lock().state()
    }

    /// Failures counted since the circuit last closed
    pub fn failures(&self) -> usize {
        self.lock().failures
    }

    /// Time the circuit last opened, set only while Open
    pub fn opened_at(&self) -> Option<f64> {
        self.lock().opened_at()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }

    pub fn is_open(&self) -> bool {
        self.state() == State::Open
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == State::HalfOpen
    }

    /// Open and past its timeout, i.e. the next call will be a trial call
    pub fn timed_out(&self) -> bool {
        let now = self.clock.now();
        self.lock()
            .timed_out(now, self.context.config.timeout_secs)
    }

    pub fn threshold(&self) -> usize {
        self.context.config.threshold
    }

    pub fn timeout_secs(&self) -> f64 {
        self.context.config.timeout_secs
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }
}

impl<T, E> std::fmt::Debug for Breaker<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Breaker")
            .field("name", &self.context.name)
            .field("config", &self.context.config)
            .field("state", &inner.state())
            .field("failures", &inner.failures)
            .field("opened_at", &inner.opened_at())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
