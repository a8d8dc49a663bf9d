//! Trailing-edge debounce as an explicit state machine.
//!
//! Every input restarts the quiet period; only the value present when the
//! period elapses without further input settles.

use std::time::{Duration, Instant};

use super::clock::Clock;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState<T> {
    Idle,
    Pending { value: T, deadline: Instant },
    Settled(T),
}

#[derive(Debug)]
pub struct Debouncer<T, C> {
    clock: C,
    delay: Duration,
    state: DebounceState<T>,
}

impl<T: Clone, C: Clock> Debouncer<T, C> {
    pub fn new(clock: C, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            state: DebounceState::Idle,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> &DebounceState<T> {
        &self.state
    }

    /// Replaces any pending value and restarts the timer.
    pub fn input(&mut self, value: T) {
        self.state = DebounceState::Pending {
            value,
            deadline: self.clock.now() + self.delay,
        };
    }

    /// Settles the pending value once its deadline has passed. Returns the
    /// settled value exactly once per burst.
    pub fn poll(&mut self) -> Option<T> {
        match &self.state {
            DebounceState::Pending { value, deadline } if self.clock.now() >= *deadline => {
                let value = value.clone();
                self.state = DebounceState::Settled(value.clone());
                Some(value)
            }
            _ => None,
        }
    }

    /// When the pending value will settle, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            DebounceState::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// The last value that settled, if the debouncer is not mid-burst.
    pub fn settled(&self) -> Option<&T> {
        match &self.state {
            DebounceState::Settled(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    pub fn reset(&mut self) {
        self.state = DebounceState::Idle;
    }
}
