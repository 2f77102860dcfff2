pub mod booking;
pub mod driver;

use std::fmt::Debug;

/// Finite-state machine over a pure transition table.
///
/// The table returns `None` for events that have no transition in the current
/// state; the machine then stays put. Callers never see an error for an
/// unrecognized event, the send is simply a no-op.
pub struct Machine<S, E> {
    state: S,
    table: fn(S, &E) -> Option<S>,
}

impl<S: Copy + Eq + Debug, E: Debug> Machine<S, E> {
    pub fn new(initial: S, table: fn(S, &E) -> Option<S>) -> Self {
        Self {
            state: initial,
            table,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    /// Applies `event`, returning `true` if the state changed.
    pub fn send(&mut self, event: &E) -> bool {
        match (self.table)(self.state, event) {
            Some(next) if next != self.state => {
                tracing::debug!(from = ?self.state, to = ?next, event = ?event, "state transition");
                self.state = next;
                true
            }
            Some(_) => false,
            None => {
                tracing::debug!(state = ?self.state, event = ?event, "event ignored");
                false
            }
        }
    }
}
