//! Arena holding every machine, state, and transition of one hierarchy.
//!
//! Handles (`State`, `StateMachine`) are thin references into this arena.
//! The only mutable runtime data are the per-machine current-state pointers,
//! which are written exclusively by the dispatch protocol, `reset`, and
//! deserialization.

use super::guard::Guard;
use super::transition::{Destination, StateHandler, Transition, TransitionHandler};
use crate::checkpoint::PATH_SEPARATOR;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier used when a state is created with a blank name.
pub(crate) const DEFAULT_IDENTIFIER: &str = "state";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct StateId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct MachineId(pub(crate) usize);

/// The top-level machine of every hierarchy.
pub(crate) const ROOT: MachineId = MachineId(0);

/// Immutable facts about a state, shared with its handles.
#[derive(Debug)]
pub(crate) struct StateMeta {
    pub(crate) id: StateId,
    pub(crate) name: String,
    pub(crate) identifier: String,
    pub(crate) machine: MachineId,
}

/// Immutable facts about a machine, shared with its handles.
#[derive(Debug)]
pub(crate) struct MachineMeta {
    pub(crate) id: MachineId,
    pub(crate) name: String,
    pub(crate) parent: Option<StateId>,
}

pub(crate) struct StateNode {
    pub(crate) meta: Arc<StateMeta>,
    pub(crate) child: Option<MachineId>,
    pub(crate) entry: Option<StateHandler>,
    pub(crate) exit: Option<StateHandler>,
    pub(crate) data: Option<Arc<dyn Any + Send + Sync>>,
}

pub(crate) struct MachineNode {
    pub(crate) meta: Arc<MachineMeta>,
    pub(crate) states: Vec<StateId>,
    /// `None` means "initial state once active".
    pub(crate) current: Option<StateId>,
}

pub(crate) struct Graph {
    machines: Vec<MachineNode>,
    states: Vec<StateNode>,
    identifiers: HashMap<String, StateId>,
    transitions: HashMap<(StateId, Uuid), Vec<Arc<Transition>>>,
}

impl Graph {
    pub(crate) fn new(root_name: &str) -> Self {
        let mut graph = Self {
            machines: Vec::new(),
            states: Vec::new(),
            identifiers: HashMap::new(),
            transitions: HashMap::new(),
        };
        graph.add_machine(root_name, None);
        graph
    }

    pub(crate) fn add_machine(&mut self, name: &str, parent: Option<StateId>) -> Arc<MachineMeta> {
        let meta = Arc::new(MachineMeta {
            id: MachineId(self.machines.len()),
            name: name.to_string(),
            parent,
        });
        if let Some(parent) = parent {
            self.states[parent.0].child = Some(meta.id);
        }
        self.machines.push(MachineNode {
            meta: Arc::clone(&meta),
            states: Vec::new(),
            current: None,
        });
        meta
    }

    pub(crate) fn add_state(&mut self, machine: MachineId, name: &str) -> Arc<StateMeta> {
        let identifier = self.unique_identifier(name);
        let meta = Arc::new(StateMeta {
            id: StateId(self.states.len()),
            name: name.to_string(),
            identifier: identifier.clone(),
            machine,
        });
        self.identifiers.insert(identifier, meta.id);
        self.machines[machine.0].states.push(meta.id);
        self.states.push(StateNode {
            meta: Arc::clone(&meta),
            child: None,
            entry: None,
            exit: None,
            data: None,
        });
        meta
    }

    /// Derive a serialization identifier from a display name, suffixing
    /// `-2`, `-3`, ... until it is unique across the whole hierarchy.
    fn unique_identifier(&self, name: &str) -> String {
        let base = if name.trim().is_empty() {
            DEFAULT_IDENTIFIER.to_string()
        } else {
            name.replace(PATH_SEPARATOR, "_")
        };
        if !self.identifiers.contains_key(&base) {
            return base;
        }
        (2usize..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !self.identifiers.contains_key(candidate))
            .unwrap_or(base)
    }

    pub(crate) fn add_transition(
        &mut self,
        from: StateId,
        event: Uuid,
        destination: Destination,
        guard: Option<Guard>,
        handler: Option<TransitionHandler>,
    ) -> usize {
        let list = self.transitions.entry((from, event)).or_default();
        let index = list.len();
        list.push(Arc::new(Transition {
            from,
            destination,
            guard,
            handler,
            index,
        }));
        index
    }

    pub(crate) fn transitions_for(&self, state: StateId, event: Uuid) -> Option<&[Arc<Transition>]> {
        self.transitions
            .get(&(state, event))
            .map(Vec::as_slice)
            .filter(|candidates| !candidates.is_empty())
    }

    pub(crate) fn state(&self, id: StateId) -> &StateNode {
        &self.states[id.0]
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut StateNode {
        &mut self.states[id.0]
    }

    pub(crate) fn machine(&self, id: MachineId) -> &MachineNode {
        &self.machines[id.0]
    }

    pub(crate) fn state_by_identifier(&self, identifier: &str) -> Option<StateId> {
        self.identifiers.get(identifier).copied()
    }

    /// Whether the machine's owning state is part of the active configuration.
    pub(crate) fn is_active(&self, id: MachineId) -> bool {
        match self.machine(id).meta.parent {
            None => true,
            Some(parent) => self.current(self.state(parent).meta.machine) == Some(parent),
        }
    }

    /// Effective current state: `None` for inactive or empty machines.
    pub(crate) fn current(&self, id: MachineId) -> Option<StateId> {
        if !self.is_active(id) {
            return None;
        }
        let machine = self.machine(id);
        machine.current.or_else(|| machine.states.first().copied())
    }

    /// Active states from `from`'s current state down to the deepest leaf.
    pub(crate) fn active_chain(&self, from: MachineId) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut machine = Some(from);
        while let Some(id) = machine {
            let Some(state) = self.current(id) else {
                break;
            };
            chain.push(state);
            machine = self.state(state).child;
        }
        chain
    }

    /// Root-first path of states whose machines lead down to `state`.
    pub(crate) fn ancestry(&self, state: StateId) -> Vec<StateId> {
        let mut path = vec![state];
        let mut machine = self.state(state).meta.machine;
        while let Some(parent) = self.machine(machine).meta.parent {
            path.push(parent);
            machine = self.state(parent).meta.machine;
        }
        path.reverse();
        path
    }

    /// Whether `state` lives in `machine` or any machine nested below it.
    pub(crate) fn contains(&self, machine: MachineId, state: StateId) -> bool {
        let mut current = Some(self.state(state).meta.machine);
        while let Some(id) = current {
            if id == machine {
                return true;
            }
            current = self
                .machine(id)
                .meta
                .parent
                .map(|parent| self.state(parent).meta.machine);
        }
        false
    }

    pub(crate) fn set_current(&mut self, machine: MachineId, state: StateId) {
        self.machines[machine.0].current = Some(state);
    }

    /// Forget the current state of every machine nested below `state`.
    pub(crate) fn deactivate_below(&mut self, state: StateId) {
        if let Some(child) = self.state(state).child {
            self.clear_subtree(child);
        }
    }

    /// Return `machine` and everything below it to the initial configuration.
    pub(crate) fn clear_subtree(&mut self, machine: MachineId) {
        self.machines[machine.0].current = None;
        let children: Vec<MachineId> = self.machines[machine.0]
            .states
            .iter()
            .filter_map(|state| self.state(*state).child)
            .collect();
        for child in children {
            self.clear_subtree(child);
        }
    }
}
