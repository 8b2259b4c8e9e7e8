//! Builder API for ergonomic breaker configuration

use crate::{
    callbacks::Callbacks,
    circuit::{Breaker, CircuitContext, Config, OpenContext, OpenHandler},
    clock::{Clock, MonotonicClock},
    errors::{CircuitError, ConfigError},
};
use std::sync::Arc;

/// Builder for creating breakers with fluent API
pub struct BreakerBuilder<T, E> {
    name: String,
    config: Config,
    clock: Option<Arc<dyn Clock>>,
    open_handler: Option<OpenHandler<T, E>>,
    callbacks: Callbacks,
}

impl<T: 'static, E: 'static> BreakerBuilder<T, E> {
    /// Create a new builder for a circuit with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            clock: None,
            open_handler: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Set the number of consecutive failures that opens the circuit
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set how long the circuit stays open before a trial call
    pub fn timeout_secs(mut self, seconds: f64) -> Self {
        self.config.timeout_secs = seconds;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the time source (defaults to [`MonotonicClock`])
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the handler that answers calls while the circuit is open
    ///
    /// # Examples
    ///
    /// ```rust
    /// use disyuntor::Breaker;
    ///
    /// let breaker: Breaker<&str, String> = Breaker::builder("quotes")
    ///     .threshold(1)
    ///     .on_circuit_open(|_ctx| Ok("cached quote"))
    ///     .build()
    ///     .unwrap();
    ///
    /// let _ = breaker.attempt(|| Err("upstream timeout".to_string()));
    /// assert_eq!(breaker.attempt(|| Ok("fresh quote")).unwrap(), "cached quote");
    /// ```
    pub fn on_circuit_open<F>(mut self, handler: F) -> Self
    where
        F: Fn(&OpenContext) -> Result<T, CircuitError<E>> + Send + Sync + 'static,
    {
        self.open_handler = Some(Arc::new(handler));
        self
    }

    /// Set callback for when circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit closes after a successful probe
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Validate the configuration and build the breaker
    pub fn build(self) -> Result<Breaker<T, E>, ConfigError> {
        self.config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let context = CircuitContext {
            name: self.name,
            config: self.config,
        };

        Ok(Breaker::from_parts(
            context,
            clock,
            self.open_handler,
            self.callbacks,
        ))
    }
}
