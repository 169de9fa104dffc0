//! Builder API for wiring transitions.
//!
//! Transitions are created from a state with [`State::transition_on`] or
//! [`State::inner_self_transition_on`] and registered with `.build()`.
//!
//! [`State::transition_on`]: crate::State::transition_on
//! [`State::inner_self_transition_on`]: crate::State::inner_self_transition_on

pub mod error;
pub mod transition;

pub use error::BuildError;
pub use transition::TransitionBuilder;
