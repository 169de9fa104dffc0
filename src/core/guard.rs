//! Guard predicates for controlling transition selection.
//!
//! Guards are evaluated in registration order while a level of the hierarchy
//! resolves an event. The first transition whose guard is absent or passes
//! is selected. A guard that returns an error stops evaluation immediately.

use super::transition::{CallbackResult, GuardInfo};
use std::fmt;

/// Predicate that determines if a transition can be selected.
///
/// Guards should be free of side effects other than firing further events,
/// which are queued until the current dispatch finishes.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, Guard, StateMachine};
///
/// let machine = StateMachine::new("door");
/// let closed = machine.create_state("closed");
/// let open = machine.create_state("open");
/// let push = Event::new("push");
///
/// let unlocked = Guard::from_predicate(|info| info.from.name() == "closed");
/// closed.transition_on(&push).to(&open).guard(unlocked).build().unwrap();
///
/// push.fire().unwrap();
/// assert_eq!(machine.current_state(), Some(open));
/// ```
pub struct Guard {
    predicate: Box<dyn Fn(&GuardInfo) -> CallbackResult<bool> + Send + Sync>,
}

impl Guard {
    /// Create a guard from a fallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&GuardInfo) -> CallbackResult<bool> + Send + Sync + 'static,
    {
        Guard {
            predicate: Box::new(predicate),
        }
    }

    /// Create a guard from a predicate that cannot fail.
    pub fn from_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&GuardInfo) -> bool + Send + Sync + 'static,
    {
        Self::new(move |info| Ok(predicate(info)))
    }

    /// Check if the guard allows the transition.
    pub fn check(&self, info: &GuardInfo) -> CallbackResult<bool> {
        (self.predicate)(info)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").finish_non_exhaustive()
    }
}
