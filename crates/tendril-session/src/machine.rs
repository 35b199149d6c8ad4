//! Save state machine.

use std::fmt;

/// Save state of one editing context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SaveState {
    /// Ready to accept a save.
    #[default]
    Idle,
    /// A write is in flight.
    Submitting,
    /// The last write failed; needs an explicit reset.
    Error,
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Error => "error",
        })
    }
}

/// Event driving [`SaveState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveEvent {
    /// A write was issued.
    Submitting,
    /// The write succeeded.
    Complete,
    /// The write failed.
    Error,
    /// Leave the error state.
    Reset,
}

/// Transition table. `None` means the event is ignored in `state`.
#[must_use]
pub fn transition(state: SaveState, event: SaveEvent) -> Option<SaveState> {
    match (state, event) {
        (SaveState::Idle, SaveEvent::Submitting) => Some(SaveState::Submitting),
        (SaveState::Submitting, SaveEvent::Complete) => Some(SaveState::Idle),
        (SaveState::Submitting, SaveEvent::Error) => Some(SaveState::Error),
        (SaveState::Error, SaveEvent::Reset) => Some(SaveState::Idle),
        _ => None,
    }
}

/// Holder of the current [`SaveState`].
#[derive(Debug, Default)]
pub struct SaveMachine {
    state: SaveState,
}

impl SaveMachine {
    /// Create a machine in [`SaveState::Idle`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SaveState {
        self.state
    }

    /// Apply an event. Returns `true` if the state changed.
    pub fn send(&mut self, event: SaveEvent) -> bool {
        match transition(self.state, event) {
            Some(next) => {
                tracing::debug!(from = %self.state, to = %next, ?event, "Save state transition");
                self.state = next;
                true
            }
            None => false,
        }
    }
}
