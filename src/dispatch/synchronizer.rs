//! Synchronizer boundary.
//!
//! A synchronizer wraps every dispatch attempt (fire, try_fire, force) on a
//! hierarchy before it reaches the reentrant queue. It may run the work
//! inline, under a lock, or hand it to another execution context. When the
//! work is deferred, the value returned to the caller is whatever the
//! synchronizer chooses and no longer reflects the eventual outcome.

use super::error::FireError;
use super::FireMode;
use parking_lot::ReentrantMutex;

/// A unit of dispatch work. Returns the dispatch outcome when run.
pub type DispatchWork = Box<dyn FnOnce() -> Result<bool, FireError> + Send + 'static>;

/// What kind of request a unit of work carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchKind {
    Fire(FireMode),
    ForceTransition,
}

/// Executes dispatch work on behalf of a hierarchy.
pub trait Synchronizer: Send + Sync {
    fn dispatch(&self, work: DispatchWork, kind: DispatchKind) -> Result<bool, FireError>;
}

impl<F> Synchronizer for F
where
    F: Fn(DispatchWork, DispatchKind) -> Result<bool, FireError> + Send + Sync,
{
    fn dispatch(&self, work: DispatchWork, kind: DispatchKind) -> Result<bool, FireError> {
        self(work, kind)
    }
}

/// Serializes dispatch across threads with a reentrant mutex.
///
/// Reentrancy lets a callback running on the dispatching thread fire
/// further events, which are then queued as usual.
#[derive(Default)]
pub struct LockingSynchronizer {
    lock: ReentrantMutex<()>,
}

impl LockingSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Synchronizer for LockingSynchronizer {
    fn dispatch(&self, work: DispatchWork, _kind: DispatchKind) -> Result<bool, FireError> {
        let _guard = self.lock.lock();
        work()
    }
}
