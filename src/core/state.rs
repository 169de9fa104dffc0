//! State handles.
//!
//! A `State` is a cheap, cloneable reference to one state of a hierarchy.
//! Every state belongs to exactly one machine and may own at most one child
//! machine, created once and kept for the state's lifetime.

use super::event::Event;
use super::graph::{StateId, StateMeta};
use super::machine::{Hierarchy, StateMachine};
use super::transition::{CallbackResult, StateHandlerInfo};
use crate::builder::{BuildError, TransitionBuilder};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A state belonging to a [`StateMachine`].
///
/// Handles compare equal when they refer to the same state of the same
/// hierarchy. Handles keep the hierarchy alive, so a callback that captures
/// a `State` or `StateMachine` ties the hierarchy's lifetime to itself.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, StateMachine};
///
/// let machine = StateMachine::new("connection");
/// let idle = machine.create_state("idle");
/// let busy = machine.create_state("busy");
/// let start = Event::new("start");
///
/// let busy = busy.with_entry(|info| {
///     assert_eq!(info.from.name(), "idle");
///     Ok(())
/// });
/// idle.transition_on(&start).to(&busy).build().unwrap();
///
/// start.fire().unwrap();
/// assert!(machine.is_in_state(&busy));
/// ```
#[derive(Clone)]
pub struct State {
    pub(crate) hierarchy: Arc<Hierarchy>,
    pub(crate) meta: Arc<StateMeta>,
}

impl State {
    pub(crate) fn new(hierarchy: Arc<Hierarchy>, meta: Arc<StateMeta>) -> Self {
        Self { hierarchy, meta }
    }

    pub(crate) fn id(&self) -> StateId {
        self.meta.id
    }

    /// Display name; not required to be unique.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Identifier used in serialized snapshots, unique across the hierarchy.
    pub fn identifier(&self) -> &str {
        &self.meta.identifier
    }

    /// Machine this state belongs to.
    pub fn parent_state_machine(&self) -> StateMachine {
        self.hierarchy.machine_handle(self.meta.machine)
    }

    /// Child machine owned by this state, if one has been created.
    pub fn child_state_machine(&self) -> Option<StateMachine> {
        let child = self.hierarchy.graph.read().state(self.id()).child;
        child.map(|id| self.hierarchy.machine_handle(id))
    }

    /// Create the child machine owned by this state.
    ///
    /// Entering this state (re)initialises the child to its first state.
    pub fn create_child_state_machine(
        &self,
        name: impl Into<String>,
    ) -> Result<StateMachine, BuildError> {
        let meta = {
            let mut graph = self.hierarchy.graph.write();
            if graph.state(self.id()).child.is_some() {
                return Err(BuildError::ChildMachineExists {
                    state: self.name().to_string(),
                });
            }
            graph.add_machine(&name.into(), Some(self.id()))
        };
        Ok(StateMachine::from_parts(Arc::clone(&self.hierarchy), meta))
    }

    /// Set the handler run when this state is entered.
    pub fn with_entry<F>(self, handler: F) -> Self
    where
        F: Fn(&StateHandlerInfo) -> CallbackResult + Send + Sync + 'static,
    {
        self.hierarchy.graph.write().state_mut(self.id()).entry = Some(Arc::new(handler));
        self
    }

    /// Set the handler run when this state is exited.
    pub fn with_exit<F>(self, handler: F) -> Self
    where
        F: Fn(&StateHandlerInfo) -> CallbackResult + Send + Sync + 'static,
    {
        self.hierarchy.graph.write().state_mut(self.id()).exit = Some(Arc::new(handler));
        self
    }

    /// Attach opaque user data, replacing any previous value.
    pub fn set_data<T: Any + Send + Sync>(&self, data: T) {
        self.hierarchy.graph.write().state_mut(self.id()).data = Some(Arc::new(data));
    }

    /// Attached user data, if present and of type `T`.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let data = self.hierarchy.graph.read().state(self.id()).data.clone()?;
        data.downcast::<T>().ok()
    }

    /// Start wiring a transition from this state on `event`.
    pub fn transition_on(&self, event: &Event) -> TransitionBuilder {
        TransitionBuilder::new(self.clone(), event.clone())
    }

    /// Start wiring an inner self transition: only the transition handler
    /// runs, and neither exit nor entry handlers are invoked.
    pub fn inner_self_transition_on(&self, event: &Event) -> TransitionBuilder {
        TransitionBuilder::inner_self(self.clone(), event.clone())
    }

    /// Whether this state is part of the active configuration.
    pub fn is_active(&self) -> bool {
        let graph = self.hierarchy.graph.read();
        graph.current(self.meta.machine) == Some(self.id())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy) && self.meta.id == other.meta.id
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.hierarchy).hash(state);
        self.meta.id.hash(state);
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name())
            .field("identifier", &self.identifier())
            .finish()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
