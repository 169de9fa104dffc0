//! State machine handles and the shared hierarchy they point into.

use super::event::Event;
use super::graph::{Graph, MachineId, MachineMeta, StateId, ROOT};
use super::record::{TransitionListener, TransitionRecord};
use super::state::State;
use crate::checkpoint::{PathSerializer, SerializationError, StateMachineSerializer};
use crate::config::MachineConfig;
use crate::dispatch::{
    DispatchQueue, FireError, FireMode, Request, Synchronizer, TransitionNotFound,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Everything owned by one top-level hierarchy: the state graph, the
/// dispatch queue, and the pluggable collaborators.
pub(crate) struct Hierarchy {
    pub(crate) graph: RwLock<Graph>,
    pub(crate) queue: Mutex<DispatchQueue>,
    pub(crate) synchronizer: RwLock<Option<Arc<dyn Synchronizer>>>,
    pub(crate) serializer: RwLock<Arc<dyn StateMachineSerializer>>,
    pub(crate) listeners: RwLock<Vec<TransitionListener>>,
    pub(crate) config: MachineConfig,
}

impl Hierarchy {
    fn new(name: &str, config: MachineConfig) -> Arc<Self> {
        Arc::new(Self {
            graph: RwLock::new(Graph::new(name)),
            queue: Mutex::new(DispatchQueue::default()),
            synchronizer: RwLock::new(None),
            serializer: RwLock::new(Arc::new(PathSerializer)),
            listeners: RwLock::new(Vec::new()),
            config,
        })
    }

    pub(crate) fn state_handle(self: &Arc<Self>, id: StateId) -> State {
        let meta = Arc::clone(&self.graph.read().state(id).meta);
        State::new(Arc::clone(self), meta)
    }

    pub(crate) fn machine_handle(self: &Arc<Self>, id: MachineId) -> StateMachine {
        let meta = Arc::clone(&self.graph.read().machine(id).meta);
        StateMachine::from_parts(Arc::clone(self), meta)
    }

    pub(crate) fn root_handle(self: &Arc<Self>) -> StateMachine {
        self.machine_handle(ROOT)
    }

    pub(crate) fn notify(&self, record: &TransitionRecord) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(record);
        }
    }
}

/// One level of a state machine hierarchy.
///
/// The top-level machine owns the hierarchy; child machines are created
/// through [`State::create_child_state_machine`]. The first state created
/// in a machine is its initial state.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, StateMachine};
///
/// let machine = StateMachine::new("light");
/// let off = machine.create_state("off");
/// let on = machine.create_state("on");
/// let toggle = Event::new("toggle");
///
/// off.transition_on(&toggle).to(&on).build().unwrap();
/// on.transition_on(&toggle).to(&off).build().unwrap();
///
/// toggle.fire().unwrap();
/// assert_eq!(machine.current_state(), Some(on.clone()));
/// assert_eq!(machine.serialize().unwrap(), "1:on");
/// ```
#[derive(Clone)]
pub struct StateMachine {
    pub(crate) hierarchy: Arc<Hierarchy>,
    pub(crate) meta: Arc<MachineMeta>,
}

impl StateMachine {
    /// Create a new top-level machine with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, MachineConfig::default())
    }

    /// Create a new top-level machine with an explicit configuration.
    pub fn with_config(name: impl Into<String>, config: MachineConfig) -> Self {
        Hierarchy::new(&name.into(), config).root_handle()
    }

    pub(crate) fn from_parts(hierarchy: Arc<Hierarchy>, meta: Arc<MachineMeta>) -> Self {
        Self { hierarchy, meta }
    }

    pub(crate) fn id(&self) -> MachineId {
        self.meta.id
    }

    /// Display name given at creation.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Create a state in this machine. The first state created is the
    /// initial state.
    pub fn create_state(&self, name: impl Into<String>) -> State {
        let meta = self.hierarchy.graph.write().add_state(self.id(), &name.into());
        debug!(
            machine = self.name(),
            state = meta.name.as_str(),
            identifier = meta.identifier.as_str(),
            "created state"
        );
        State::new(Arc::clone(&self.hierarchy), meta)
    }

    /// States of this machine in creation order.
    pub fn states(&self) -> Vec<State> {
        let ids = self.hierarchy.graph.read().machine(self.id()).states.clone();
        ids.into_iter()
            .map(|id| self.hierarchy.state_handle(id))
            .collect()
    }

    /// First state created in this machine, if any.
    pub fn initial_state(&self) -> Option<State> {
        let initial = self.hierarchy.graph.read().machine(self.id()).states.first().copied();
        initial.map(|id| self.hierarchy.state_handle(id))
    }

    /// Current state, or `None` if this is a child machine whose parent
    /// state is not active (or the machine has no states).
    pub fn current_state(&self) -> Option<State> {
        let current = self.hierarchy.graph.read().current(self.id());
        current.map(|id| self.hierarchy.state_handle(id))
    }

    /// Deepest active state at or below this machine.
    pub fn current_child_state(&self) -> Option<State> {
        let leaf = self.hierarchy.graph.read().active_chain(self.id()).last().copied();
        leaf.map(|id| self.hierarchy.state_handle(id))
    }

    /// Whether this machine is part of the active configuration. The
    /// top-level machine is always active; a child machine is active while
    /// its parent state is.
    pub fn is_active(&self) -> bool {
        self.hierarchy.graph.read().is_active(self.id())
    }

    /// Whether `state` is part of the active configuration at or below
    /// this machine.
    pub fn is_in_state(&self, state: &State) -> bool {
        Arc::ptr_eq(&self.hierarchy, &state.hierarchy)
            && self.hierarchy.graph.read().active_chain(self.id()).contains(&state.id())
    }

    /// State owning this machine; `None` for the top-level machine.
    pub fn parent_state(&self) -> Option<State> {
        self.meta.parent.map(|id| self.hierarchy.state_handle(id))
    }

    /// Whether this machine has no parent state.
    pub fn is_top_level(&self) -> bool {
        self.meta.parent.is_none()
    }

    /// Top-level machine of the hierarchy this machine belongs to.
    pub fn top_level(&self) -> StateMachine {
        self.hierarchy.root_handle()
    }

    /// Look up a state anywhere in the hierarchy by serialization identifier.
    pub fn state_by_identifier(&self, identifier: &str) -> Option<State> {
        let id = self.hierarchy.graph.read().state_by_identifier(identifier);
        id.map(|id| self.hierarchy.state_handle(id))
    }

    /// Fire `event` against this hierarchy, failing if it is not accepted.
    ///
    /// An event that is not wired into this hierarchy is never resolved
    /// here; the failure names the hierarchy that owns it, if any.
    pub fn fire(&self, event: &Event) -> Result<(), FireError> {
        self.owned_event(event)?;
        self.hierarchy
            .request(Request::fire(event.clone(), FireMode::MustSucceed))
            .map(|_| ())
    }

    /// Fire `event` against this hierarchy, returning `Ok(false)` if it is
    /// not accepted or not wired into this hierarchy.
    pub fn try_fire(&self, event: &Event) -> Result<bool, FireError> {
        if let Err(not_found) = self.owned_event(event) {
            debug!(event = event.name(), error = %not_found, "event not owned by this hierarchy");
            return Ok(false);
        }
        self.hierarchy
            .request(Request::fire(event.clone(), FireMode::BestEffort))
    }

    /// Move unconditionally to `target`, which may be nested anywhere below
    /// this machine. `event` is passed to handlers for attribution only.
    ///
    /// Exit and entry handlers run as for a normal transition. Like a fire,
    /// a force requested from inside a callback is queued.
    pub fn force_transition(&self, target: &State, event: &Event) -> Result<(), FireError> {
        let owned = Arc::ptr_eq(&self.hierarchy, &target.hierarchy)
            && self.hierarchy.graph.read().contains(self.id(), target.id());
        if !owned {
            return Err(FireError::ForeignState {
                state: target.name().to_string(),
                machine: self.name().to_string(),
            });
        }
        self.hierarchy
            .request(Request::force(target.clone(), event.clone()))
            .map(|_| ())
    }

    fn owned_event(&self, event: &Event) -> Result<(), TransitionNotFound> {
        match event.owner() {
            Some(owner) if Arc::ptr_eq(&owner, &self.hierarchy) => Ok(()),
            Some(owner) => Err(TransitionNotFound {
                state_machine: Some(owner.root_handle()),
                from: None,
                event: event.clone(),
            }),
            None => Err(TransitionNotFound::unbound(event.clone())),
        }
    }

    /// Return this machine and every machine below it to their initial
    /// states. No handlers are run.
    ///
    /// This bypasses the dispatch queue. Called from a guard, handler, or
    /// entry/exit callback it moves pointers in the middle of the transition
    /// being committed; use [`force_transition`](Self::force_transition)
    /// from callbacks instead.
    pub fn reset(&self) {
        self.hierarchy.graph.write().clear_subtree(self.id());
        debug!(machine = self.name(), "reset to initial configuration");
    }

    /// Install or remove the synchronizer that wraps every dispatch on this
    /// hierarchy.
    pub fn set_synchronizer(&self, synchronizer: Option<Arc<dyn Synchronizer>>) {
        *self.hierarchy.synchronizer.write() = synchronizer;
    }

    /// Replace the serializer used by [`serialize`](Self::serialize) and
    /// [`deserialize`](Self::deserialize) across the whole hierarchy.
    pub fn set_serializer(&self, serializer: Arc<dyn StateMachineSerializer>) {
        *self.hierarchy.serializer.write() = serializer;
    }

    /// Serializer currently installed on the hierarchy.
    pub fn serializer(&self) -> Arc<dyn StateMachineSerializer> {
        Arc::clone(&self.hierarchy.serializer.read())
    }

    /// Register a hierarchy-wide listener, invoked after each committed
    /// transition.
    pub fn on_transition<F>(&self, listener: F)
    where
        F: Fn(&TransitionRecord) + Send + Sync + 'static,
    {
        self.hierarchy.listeners.write().push(Arc::new(listener));
    }

    /// Snapshot the active configuration at and below this machine.
    pub fn serialize(&self) -> Result<String, SerializationError> {
        self.serializer().serialize(self)
    }

    /// Restore a snapshot produced by [`serialize`](Self::serialize).
    ///
    /// Current-state pointers are relocated directly; no handlers run. On
    /// error the configuration is left unchanged. A child machine can only
    /// be restored while it is active.
    ///
    /// Like [`reset`](Self::reset), this bypasses the dispatch queue and
    /// must not be called from inside a callback.
    pub fn deserialize(&self, serialized: &str) -> Result<(), SerializationError> {
        let path = self.serializer().deserialize(self, serialized)?;
        self.apply_path(&path)?;
        debug!(machine = self.name(), serialized, "restored snapshot");
        Ok(())
    }

    /// Relocate pointers along a root-first path of states, validating that
    /// each state belongs to the machine owned by its predecessor.
    fn apply_path(&self, path: &[State]) -> Result<(), SerializationError> {
        let mut graph = self.hierarchy.graph.write();
        if !graph.is_active(self.id()) {
            return Err(SerializationError::Inactive {
                machine: self.name().to_string(),
            });
        }
        let mut expected = Some(self.id());
        for state in path {
            let Some(machine) = expected else {
                return Err(SerializationError::OverSpecified {
                    identifier: state.identifier().to_string(),
                });
            };
            if !Arc::ptr_eq(&self.hierarchy, &state.hierarchy) || state.meta.machine != machine {
                return Err(SerializationError::WrongMachine {
                    identifier: state.identifier().to_string(),
                    machine: graph.machine(machine).meta.name.clone(),
                });
            }
            expected = graph
                .state(state.id())
                .child
                .filter(|child| !graph.machine(*child).states.is_empty());
        }
        if let Some(machine) = expected {
            return Err(SerializationError::UnderSpecified {
                machine: graph.machine(machine).meta.name.clone(),
            });
        }

        graph.clear_subtree(self.id());
        for state in path {
            graph.set_current(state.meta.machine, state.id());
        }
        Ok(())
    }
}

impl PartialEq for StateMachine {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy) && self.meta.id == other.meta.id
    }
}

impl Eq for StateMachine {}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
