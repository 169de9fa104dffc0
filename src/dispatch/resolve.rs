//! Hierarchical resolution and guard selection.
//!
//! Resolution starts at the deepest active state and bubbles outward. The
//! first level with any transition registered for the event claims it; an
//! ancestor is never consulted once a descendant has claimed, even if every
//! candidate there is rejected by its guard. Within the claiming level the
//! first candidate (in registration order) with no guard or a passing guard
//! is selected.

use super::error::{FireError, TransitionNotFound};
use crate::core::graph::ROOT;
use crate::core::machine::Hierarchy;
use crate::core::transition::{Destination, Transition};
use crate::core::{Event, GuardInfo, SelectorInfo, State};
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) struct Selected {
    pub(crate) from: State,
    pub(crate) to: State,
    pub(crate) transition: Arc<Transition>,
}

pub(crate) enum Resolution {
    Selected(Selected),
    NotFound(TransitionNotFound),
}

pub(crate) fn resolve(hierarchy: &Arc<Hierarchy>, event: &Event) -> Result<Resolution, FireError> {
    let (claimed, top) = {
        let graph = hierarchy.graph.read();
        let chain = graph.active_chain(ROOT);
        let claimed = chain.iter().rev().find_map(|state| {
            graph
                .transitions_for(*state, event.id())
                .map(|candidates| (*state, candidates.to_vec()))
        });
        (claimed, chain.first().copied())
    };

    let Some((from, candidates)) = claimed else {
        debug!(event = event.name(), "no level of the hierarchy handles event");
        return Ok(Resolution::NotFound(TransitionNotFound {
            state_machine: Some(hierarchy.root_handle()),
            from: top.map(|id| hierarchy.state_handle(id)),
            event: event.clone(),
        }));
    };

    let from = hierarchy.state_handle(from);
    for transition in candidates {
        if let Some(guard) = &transition.guard {
            let info = GuardInfo {
                from: from.clone(),
                to: transition
                    .fixed_destination()
                    .map(|id| hierarchy.state_handle(id)),
                event: event.clone(),
            };
            let allowed = guard.check(&info).map_err(FireError::Callback)?;
            trace!(
                event = event.name(),
                from = from.name(),
                index = transition.index,
                allowed,
                "evaluated guard"
            );
            if !allowed {
                continue;
            }
        }
        let to = destination(hierarchy, &transition, &from, event)?;
        debug!(
            event = event.name(),
            from = from.name(),
            to = to.name(),
            index = transition.index,
            "selected transition"
        );
        return Ok(Resolution::Selected(Selected {
            from,
            to,
            transition,
        }));
    }

    debug!(
        event = event.name(),
        from = from.name(),
        "every candidate rejected by its guard"
    );
    Ok(Resolution::NotFound(TransitionNotFound {
        state_machine: Some(from.parent_state_machine()),
        from: Some(from),
        event: event.clone(),
    }))
}

fn destination(
    hierarchy: &Arc<Hierarchy>,
    transition: &Transition,
    from: &State,
    event: &Event,
) -> Result<State, FireError> {
    match &transition.destination {
        Destination::Fixed(to) => Ok(hierarchy.state_handle(*to)),
        Destination::InnerSelf => Ok(from.clone()),
        Destination::Dynamic(selector) => {
            let to = selector(&SelectorInfo {
                from: from.clone(),
                event: event.clone(),
            });
            let same_machine =
                Arc::ptr_eq(&to.hierarchy, &from.hierarchy) && to.meta.machine == from.meta.machine;
            if same_machine {
                Ok(to)
            } else {
                Err(FireError::InvalidDestination {
                    from: from.name().to_string(),
                    to: to.name().to_string(),
                })
            }
        }
    }
}
