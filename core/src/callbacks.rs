//! Hooks fired on circuit state transitions

use std::sync::Arc;

pub type TransitionHook = Arc<dyn Fn(&str) + Send + Sync>;

/// A state change worth telling observers about
///
/// The Closed -> Closed reset after a successful call is not one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Opened,
    HalfOpened,
    Closed,
}

/// Callbacks for circuit breaker transitions, each receiving the circuit name
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<TransitionHook>,
    pub on_close: Option<TransitionHook>,
    pub on_half_open: Option<TransitionHook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notify(&self, circuit: &str, transition: Transition) {
        let hook = match transition {
            Transition::Opened => &self.on_open,
            Transition::HalfOpened => &self.on_half_open,
            Transition::Closed => &self.on_close,
        };

        if let Some(callback) = hook {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}
