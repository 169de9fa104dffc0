//! Transitions and the values passed to user callbacks.
//!
//! A transition is immutable once registered. Its destination is either a
//! fixed state, a selector evaluated at fire time, or the from-state itself
//! for inner self transitions (which skip exit and entry handlers).

use super::event::Event;
use super::graph::StateId;
use super::guard::Guard;
use super::state::State;
use std::sync::Arc;

/// Result type returned by guards, handlers, and entry/exit callbacks.
///
/// Any error is propagated unmodified to the call that triggered dispatch.
pub type CallbackResult<T = ()> = anyhow::Result<T>;

pub(crate) type Selector = Box<dyn Fn(&SelectorInfo) -> State + Send + Sync>;
pub(crate) type TransitionHandler = Box<dyn Fn(&TransitionInfo) -> CallbackResult + Send + Sync>;
pub(crate) type StateHandler = Arc<dyn Fn(&StateHandlerInfo) -> CallbackResult + Send + Sync>;

pub(crate) enum Destination {
    Fixed(StateId),
    Dynamic(Selector),
    InnerSelf,
}

pub(crate) struct Transition {
    pub(crate) from: StateId,
    pub(crate) destination: Destination,
    pub(crate) guard: Option<Guard>,
    pub(crate) handler: Option<TransitionHandler>,
    /// Position in the from-state's list for this event.
    pub(crate) index: usize,
}

impl Transition {
    pub(crate) fn is_inner(&self) -> bool {
        matches!(self.destination, Destination::InnerSelf)
    }

    /// Destination known before the transition is selected, if any.
    pub(crate) fn fixed_destination(&self) -> Option<StateId> {
        match self.destination {
            Destination::Fixed(to) => Some(to),
            Destination::InnerSelf => Some(self.from),
            Destination::Dynamic(_) => None,
        }
    }
}

/// Passed to guards while candidates are evaluated.
#[derive(Clone, Debug)]
pub struct GuardInfo {
    pub from: State,
    /// `None` for dynamic transitions, whose destination is chosen after the guard passes.
    pub to: Option<State>,
    pub event: Event,
}

/// Passed to the selector of a dynamic transition.
#[derive(Clone, Debug)]
pub struct SelectorInfo {
    pub from: State,
    pub event: Event,
}

/// Passed to the handler of a selected transition.
#[derive(Clone, Debug)]
pub struct TransitionInfo {
    pub from: State,
    pub to: State,
    pub event: Event,
    pub is_inner_transition: bool,
}

/// Passed to entry and exit handlers.
#[derive(Clone, Debug)]
pub struct StateHandlerInfo {
    /// State the hierarchy is transitioning away from.
    pub from: State,
    /// State the hierarchy is transitioning to.
    pub to: State,
    pub event: Event,
}
