//! Builder for registering transitions.

use crate::builder::error::BuildError;
use crate::core::transition::{Destination, Selector, TransitionHandler};
use crate::core::{CallbackResult, Event, Guard, GuardInfo, SelectorInfo, State, TransitionInfo};
use std::sync::Arc;
use tracing::debug;

enum Target {
    Fixed(State),
    Dynamic(Selector),
    InnerSelf,
}

/// Builder for a transition from one state on one event, with a fluent API.
///
/// Nothing is registered until [`build`](Self::build) is called. Transitions
/// registered for the same state and event are considered in the order they
/// were built.
#[must_use = "a transition is only registered once .build() is called"]
pub struct TransitionBuilder {
    from: State,
    event: Event,
    target: Option<Target>,
    guard: Option<Guard>,
    handler: Option<TransitionHandler>,
}

impl TransitionBuilder {
    pub(crate) fn new(from: State, event: Event) -> Self {
        Self {
            from,
            event,
            target: None,
            guard: None,
            handler: None,
        }
    }

    pub(crate) fn inner_self(from: State, event: Event) -> Self {
        Self {
            target: Some(Target::InnerSelf),
            ..Self::new(from, event)
        }
    }

    /// Set a fixed destination in the same machine as the from-state.
    pub fn to(mut self, state: &State) -> Self {
        self.target = Some(Target::Fixed(state.clone()));
        self
    }

    /// Choose the destination when the transition is selected.
    ///
    /// The selector must return a state of the from-state's machine;
    /// anything else fails the dispatch with
    /// [`FireError::InvalidDestination`](crate::FireError::InvalidDestination).
    pub fn to_dynamic<F>(mut self, selector: F) -> Self
    where
        F: Fn(&SelectorInfo) -> State + Send + Sync + 'static,
    {
        self.target = Some(Target::Dynamic(Box::new(selector)));
        self
    }

    /// Add a guard (optional).
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&GuardInfo) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::from_predicate(predicate))
    }

    /// Add a guard that may fail. An error aborts resolution and is
    /// returned from the dispatch call.
    pub fn try_when<F>(self, predicate: F) -> Self
    where
        F: Fn(&GuardInfo) -> CallbackResult<bool> + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Set the handler run after the current-state pointer has moved.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransitionInfo) -> CallbackResult + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Register the transition.
    pub fn build(self) -> Result<(), BuildError> {
        let destination = match self.target.ok_or(BuildError::MissingTarget)? {
            Target::Fixed(to) => {
                let same_machine = Arc::ptr_eq(&to.hierarchy, &self.from.hierarchy)
                    && to.meta.machine == self.from.meta.machine;
                if !same_machine {
                    return Err(BuildError::TargetInDifferentMachine {
                        from: self.from.name().to_string(),
                        to: to.name().to_string(),
                    });
                }
                Destination::Fixed(to.id())
            }
            Target::Dynamic(selector) => Destination::Dynamic(selector),
            Target::InnerSelf => Destination::InnerSelf,
        };

        self.event.bind(&self.from.hierarchy)?;

        let inner = matches!(destination, Destination::InnerSelf);
        let index = self.from.hierarchy.graph.write().add_transition(
            self.from.id(),
            self.event.id(),
            destination,
            self.guard,
            self.handler,
        );
        debug!(
            event = self.event.name(),
            from = self.from.name(),
            index,
            inner,
            "registered transition"
        );
        Ok(())
    }
}
