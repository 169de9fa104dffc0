//! Records of committed transitions, delivered to transition listeners.

use super::event::Event;
use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(crate) type TransitionListener = Arc<dyn Fn(&TransitionRecord) + Send + Sync>;

/// How a transition was committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Selected by event resolution; exit and entry handlers ran.
    Normal,
    /// Inner self transition; only the transition handler ran.
    InnerSelf,
    /// Relocation requested through `force_transition`.
    Forced,
}

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, StateMachine, TransitionKind};
/// use std::sync::{Arc, Mutex};
///
/// let machine = StateMachine::new("sm");
/// let a = machine.create_state("a");
/// let b = machine.create_state("b");
/// let go = Event::new("go");
/// a.transition_on(&go).to(&b).build().unwrap();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// machine.on_transition(move |record| {
///     sink.lock().unwrap().push((record.from.name().to_string(), record.kind));
/// });
///
/// go.fire().unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![("a".to_string(), TransitionKind::Normal)]);
/// ```
#[derive(Clone, Debug)]
pub struct TransitionRecord {
    /// The state being transitioned from
    pub from: State,
    /// The state being transitioned to
    pub to: State,
    /// Event that triggered (or was attributed to) the transition
    pub event: Event,
    pub kind: TransitionKind,
    /// When the transition committed
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub(crate) fn new(from: State, to: State, event: Event, kind: TransitionKind) -> Self {
        Self {
            from,
            to,
            event,
            kind,
            timestamp: Utc::now(),
        }
    }
}
