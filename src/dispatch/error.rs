//! Dispatch error types.

use crate::core::{Event, State, StateMachine};
use std::fmt;
use thiserror::Error;

/// No level of the hierarchy accepted an event.
///
/// `state_machine` and `from` are absent when the event has never been
/// wired into any hierarchy.
#[derive(Clone, Debug)]
pub struct TransitionNotFound {
    /// Machine that claimed the event (or the top-level machine if none did)
    pub state_machine: Option<StateMachine>,
    /// Current state of that machine when resolution failed
    pub from: Option<State>,
    pub event: Event,
}

impl TransitionNotFound {
    pub(crate) fn unbound(event: Event) -> Self {
        Self {
            state_machine: None,
            from: None,
            event,
        }
    }
}

impl fmt::Display for TransitionNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.state_machine, &self.from) {
            (Some(machine), Some(from)) => write!(
                f,
                "No transition on event '{}' from state '{}' in state machine '{}'",
                self.event, from, machine
            ),
            (Some(machine), None) => write!(
                f,
                "No transition on event '{}' in state machine '{}'",
                self.event, machine
            ),
            _ => write!(
                f,
                "Event '{}' is not associated with any state machine",
                self.event
            ),
        }
    }
}

impl std::error::Error for TransitionNotFound {}

/// Errors returned by `fire`, `try_fire`, and `force_transition`.
#[derive(Debug, Error)]
pub enum FireError {
    #[error(transparent)]
    TransitionNotFound(#[from] TransitionNotFound),

    /// A guard, handler, selector, or entry/exit callback failed.
    #[error(transparent)]
    Callback(anyhow::Error),

    #[error("Dynamic transition from '{from}' selected '{to}', which is not a state of the same machine")]
    InvalidDestination { from: String, to: String },

    #[error("State '{state}' is not part of state machine '{machine}'")]
    ForeignState { state: String, machine: String },

    #[error("Dispatch queue exceeded its limit of {limit} pending requests")]
    QueueOverflow { limit: usize },
}

impl FireError {
    /// The not-found details, if this is a not-found failure.
    pub fn as_transition_not_found(&self) -> Option<&TransitionNotFound> {
        match self {
            Self::TransitionNotFound(not_found) => Some(not_found),
            _ => None,
        }
    }

    /// The error raised by user code, if this is a callback failure.
    pub fn as_callback(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Callback(error) => Some(error),
            _ => None,
        }
    }
}
