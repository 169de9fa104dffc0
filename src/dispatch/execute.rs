//! Committing a selected transition.
//!
//! Exit handlers run innermost-first, starting from the deepest active state
//! below the from-state and ending with the from-state itself. Current-state
//! pointers are then moved, the transition handler runs, and entry handlers
//! run outermost-first: the to-state, then the initial state of each child
//! machine below it.
//!
//! No graph lock is held while user code runs, so callbacks are free to
//! query the hierarchy or fire further events (which are queued).

use super::error::FireError;
use super::resolve::Selected;
use crate::core::graph::{StateId, ROOT};
use crate::core::machine::Hierarchy;
use crate::core::transition::StateHandler;
use crate::core::{Event, State, StateHandlerInfo, TransitionInfo, TransitionKind, TransitionRecord};
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) fn commit(
    hierarchy: &Arc<Hierarchy>,
    selected: Selected,
    event: &Event,
) -> Result<(), FireError> {
    let Selected {
        from,
        to,
        transition,
    } = selected;

    if transition.is_inner() {
        if let Some(handler) = &transition.handler {
            handler(&TransitionInfo {
                from: from.clone(),
                to: to.clone(),
                event: event.clone(),
                is_inner_transition: true,
            })
            .map_err(FireError::Callback)?;
        }
        debug!(event = event.name(), state = from.name(), "inner self transition");
        hierarchy.notify(&TransitionRecord::new(
            from,
            to,
            event.clone(),
            TransitionKind::InnerSelf,
        ));
        return Ok(());
    }

    let info = StateHandlerInfo {
        from: from.clone(),
        to: to.clone(),
        event: event.clone(),
    };
    exit_from(hierarchy, from.id(), &info)?;

    {
        let mut graph = hierarchy.graph.write();
        graph.deactivate_below(from.id());
        graph.deactivate_below(to.id());
        graph.set_current(to.meta.machine, to.id());
    }

    if let Some(handler) = &transition.handler {
        handler(&TransitionInfo {
            from: from.clone(),
            to: to.clone(),
            event: event.clone(),
            is_inner_transition: false,
        })
        .map_err(FireError::Callback)?;
    }

    run_entry(hierarchy, to.id(), &info)?;
    cascade_initial(hierarchy, to.id(), &info)?;

    debug!(
        event = event.name(),
        from = from.name(),
        to = to.name(),
        "committed transition"
    );
    hierarchy.notify(&TransitionRecord::new(from, to, event.clone(), TransitionKind::Normal));
    Ok(())
}

/// Relocate the hierarchy so that `target` is active.
///
/// Only the levels that actually change are exited and re-entered. Forcing
/// into a state that is already active re-enters it.
pub(crate) fn force(
    hierarchy: &Arc<Hierarchy>,
    target: &State,
    event: &Event,
) -> Result<(), FireError> {
    let (path, left) = {
        let graph = hierarchy.graph.read();
        let path = graph.ancestry(target.id());
        let chain = graph.active_chain(ROOT);
        let diverge = path
            .iter()
            .zip(chain.iter())
            .position(|(wanted, active)| wanted != active)
            .unwrap_or_else(|| path.len().min(chain.len()).saturating_sub(1));
        let left = chain.get(diverge).copied();
        (path[diverge..].to_vec(), left)
    };

    let from = match left {
        Some(id) => hierarchy.state_handle(id),
        None => target.clone(),
    };
    let info = StateHandlerInfo {
        from: from.clone(),
        to: target.clone(),
        event: event.clone(),
    };

    if let Some(left) = left {
        exit_from(hierarchy, left, &info)?;
    }

    {
        let mut graph = hierarchy.graph.write();
        if let Some(left) = left {
            graph.deactivate_below(left);
        }
        for state in &path {
            let machine = graph.state(*state).meta.machine;
            graph.set_current(machine, *state);
        }
        graph.deactivate_below(target.id());
    }

    for state in &path {
        run_entry(hierarchy, *state, &info)?;
    }
    cascade_initial(hierarchy, target.id(), &info)?;

    debug!(
        event = event.name(),
        from = from.name(),
        to = target.name(),
        "forced transition"
    );
    hierarchy.notify(&TransitionRecord::new(
        from,
        target.clone(),
        event.clone(),
        TransitionKind::Forced,
    ));
    Ok(())
}

/// Run exit handlers for `state` and every active state below it,
/// innermost first.
fn exit_from(
    hierarchy: &Arc<Hierarchy>,
    state: StateId,
    info: &StateHandlerInfo,
) -> Result<(), FireError> {
    let handlers: Vec<(String, Option<StateHandler>)> = {
        let graph = hierarchy.graph.read();
        let mut exiting = vec![state];
        if let Some(child) = graph.state(state).child {
            exiting.extend(graph.active_chain(child));
        }
        exiting
            .into_iter()
            .rev()
            .map(|id| {
                let node = graph.state(id);
                (node.meta.name.clone(), node.exit.clone())
            })
            .collect()
    };

    for (name, handler) in handlers {
        trace!(state = name.as_str(), "exiting state");
        if let Some(handler) = handler {
            handler(info).map_err(FireError::Callback)?;
        }
    }
    Ok(())
}

fn run_entry(
    hierarchy: &Arc<Hierarchy>,
    state: StateId,
    info: &StateHandlerInfo,
) -> Result<(), FireError> {
    let (name, handler) = {
        let graph = hierarchy.graph.read();
        let node = graph.state(state);
        (node.meta.name.clone(), node.entry.clone())
    };
    trace!(state = name.as_str(), "entering state");
    match handler {
        Some(handler) => handler(info).map_err(FireError::Callback),
        None => Ok(()),
    }
}

/// Enter the initial state of each child machine below `state`.
fn cascade_initial(
    hierarchy: &Arc<Hierarchy>,
    state: StateId,
    info: &StateHandlerInfo,
) -> Result<(), FireError> {
    let mut current = state;
    loop {
        let initial = {
            let graph = hierarchy.graph.read();
            graph
                .state(current)
                .child
                .and_then(|child| graph.machine(child).states.first().copied())
        };
        let Some(initial) = initial else {
            return Ok(());
        };
        run_entry(hierarchy, initial, info)?;
        current = initial;
    }
}
