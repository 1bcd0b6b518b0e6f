//! Engine
//!
//! Top-level orchestrator of the kernel. Validates via `validation`,
//! mutates via `transitions`. Holds no I/O: persisting an accepted event
//! between `check` and `execute` is the runtime's job.

use crate::error::ValidationError;
use crate::events::Event;
use crate::state::{create_initial_state, StoreState};
use crate::transitions::apply_event as transition_apply;
use crate::validation::validate_event;

/// Stateful engine wrapping the validation and transition layers.
#[derive(Debug, Clone, Default)]
pub struct BieterEngine {
    state: StoreState,
    applied: u64,
}

impl BieterEngine {
    /// Engine over a fresh initial state.
    pub fn new() -> Self {
        Self {
            state: create_initial_state(),
            applied: 0,
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Number of events executed since the last reset.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Validate without mutating.
    pub fn check(&self, event: &Event, as_admin: bool) -> Result<(), ValidationError> {
        validate_event(&self.state, event, as_admin)
    }

    /// Execute an event that was validated or comes from the trusted log.
    pub fn execute(&mut self, event: &Event) {
        transition_apply(&mut self.state, event);
        self.applied += 1;
    }

    /// `check` followed by `execute`.
    pub fn apply(&mut self, event: &Event, as_admin: bool) -> Result<(), ValidationError> {
        self.check(event, as_admin)?;
        self.execute(event);
        Ok(())
    }

    /// Execute an ordered sequence of trusted events.
    pub fn apply_sequence(&mut self, events: &[Event]) -> &StoreState {
        for event in events {
            self.execute(event);
        }
        &self.state
    }

    /// Event-sourced reconstruction: reset and replay.
    pub fn replay(&mut self, events: &[Event]) -> &StoreState {
        self.state = create_initial_state();
        self.applied = 0;
        self.apply_sequence(events)
    }
}
