//! Events: named stimuli that are independent of any one state machine.

use super::machine::{Hierarchy, StateMachine};
use crate::builder::BuildError;
use crate::dispatch::{FireError, FireMode, Request, TransitionNotFound};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};
use uuid::Uuid;

/// An event which can be fired to trigger a transition.
///
/// An event is bound to a top-level hierarchy the first time a transition on
/// it is registered. The same event may be wired into states that live in
/// different branches of that hierarchy. Cloning an event yields a handle
/// to the same event.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, StateMachine};
///
/// let machine = StateMachine::new("player");
/// let stopped = machine.create_state("stopped");
/// let playing = machine.create_state("playing");
/// let play = Event::new("play");
///
/// stopped.transition_on(&play).to(&playing).build().unwrap();
///
/// assert!(play.try_fire().unwrap());
/// assert!(!play.try_fire().unwrap());
/// assert_eq!(machine.current_state(), Some(playing));
/// ```
#[derive(Clone)]
pub struct Event {
    inner: Arc<EventInner>,
}

struct EventInner {
    id: Uuid,
    name: String,
    owner: OnceLock<Weak<Hierarchy>>,
}

impl Event {
    /// Create an unwired event. It binds to a hierarchy when its first
    /// transition is built.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventInner {
                id: Uuid::new_v4(),
                name: name.into(),
                owner: OnceLock::new(),
            }),
        }
    }

    /// Display name given at creation.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Top-level state machine this event has been wired into, if any.
    pub fn state_machine(&self) -> Option<StateMachine> {
        self.owner().map(|hierarchy| hierarchy.root_handle())
    }

    pub(crate) fn owner(&self) -> Option<Arc<Hierarchy>> {
        self.inner.owner.get().and_then(Weak::upgrade)
    }

    pub(crate) fn bind(&self, hierarchy: &Arc<Hierarchy>) -> Result<(), BuildError> {
        let owner = self.inner.owner.get_or_init(|| Arc::downgrade(hierarchy));
        if owner.as_ptr() == Arc::as_ptr(hierarchy) {
            Ok(())
        } else {
            Err(BuildError::EventBoundElsewhere {
                event: self.name().to_string(),
            })
        }
    }

    /// Fire this event, failing with [`FireError::TransitionNotFound`] if no
    /// level of the active hierarchy accepts it.
    ///
    /// When called from inside a guard, handler, or entry/exit callback the
    /// request is queued and this call succeeds; any failure surfaces from
    /// the outermost dispatch call instead.
    pub fn fire(&self) -> Result<(), FireError> {
        match self.owner() {
            Some(hierarchy) => hierarchy
                .request(Request::fire(self.clone(), FireMode::MustSucceed))
                .map(|_| ()),
            None => Err(TransitionNotFound::unbound(self.clone()).into()),
        }
    }

    /// Fire this event, returning `Ok(false)` instead of failing when no
    /// transition is found.
    ///
    /// Guard and handler faults are still returned as errors. Called
    /// reentrantly, this always returns `Ok(true)`.
    pub fn try_fire(&self) -> Result<bool, FireError> {
        match self.owner() {
            Some(hierarchy) => {
                hierarchy.request(Request::fire(self.clone(), FireMode::BestEffort))
            }
            None => Ok(false),
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("name", &self.name()).finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
