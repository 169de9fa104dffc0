//! Errors raised while wiring states, machines, and transitions.

use thiserror::Error;

/// Errors that can occur when building a hierarchy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Transition target not specified. Call .to(state) or .to_dynamic(selector)")]
    MissingTarget,

    #[error("Transition from '{from}' targets '{to}', which belongs to a different state machine")]
    TargetInDifferentMachine { from: String, to: String },

    #[error("Event '{event}' is already used by a different state machine hierarchy")]
    EventBoundElsewhere { event: String },

    #[error("State '{state}' already has a child state machine")]
    ChildMachineExists { state: String },
}
