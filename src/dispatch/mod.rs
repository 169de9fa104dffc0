//! Reentrant event dispatch.
//!
//! Each hierarchy owns one queue and one "dispatching" flag. A request that
//! arrives while the flag is clear runs synchronously and then drains
//! everything queued during its execution, one request at a time, each
//! resolved against the then-current state. A request that arrives while the
//! flag is set (from inside a guard, handler, or entry/exit callback) is
//! appended to the queue and reported as accepted.
//!
//! Fire mode belongs to the request: a queued `MustSucceed` request that
//! fails to resolve raises its failure out of the outermost dispatch call,
//! while a queued `BestEffort` request that fails is discarded. Any error
//! aborts the drain and discards whatever is still queued.

mod error;
mod execute;
mod resolve;
mod synchronizer;

pub use error::{FireError, TransitionNotFound};
pub use synchronizer::{DispatchKind, DispatchWork, LockingSynchronizer, Synchronizer};

use crate::core::machine::Hierarchy;
use crate::core::{Event, State};
use parking_lot::Mutex;
use resolve::Resolution;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a request's failure to find a transition is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FireMode {
    /// `fire`: not-found is raised as an error.
    MustSucceed,
    /// `try_fire`: not-found is reported as `false`.
    BestEffort,
}

/// A queued unit of dispatch. Requests carry no state snapshot; they are
/// resolved against whatever is current when they are processed.
pub(crate) enum Request {
    Fire { event: Event, mode: FireMode },
    Force { target: State, event: Event },
}

impl Request {
    pub(crate) fn fire(event: Event, mode: FireMode) -> Self {
        Self::Fire { event, mode }
    }

    pub(crate) fn force(target: State, event: Event) -> Self {
        Self::Force { target, event }
    }

    fn kind(&self) -> DispatchKind {
        match self {
            Self::Fire { mode, .. } => DispatchKind::Fire(*mode),
            Self::Force { .. } => DispatchKind::ForceTransition,
        }
    }

    fn event(&self) -> &Event {
        match self {
            Self::Fire { event, .. } | Self::Force { event, .. } => event,
        }
    }
}

#[derive(Default)]
pub(crate) struct DispatchQueue {
    dispatching: bool,
    pending: VecDeque<Request>,
    overflowed: bool,
}

impl DispatchQueue {
    /// Abandon the current dispatch, returning how many requests were dropped.
    fn abandon(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.dispatching = false;
        self.overflowed = false;
        dropped
    }
}

/// Clears the dispatching flag if the drain exits early through an error
/// or a panicking callback.
struct ActiveDispatch<'a> {
    queue: &'a Mutex<DispatchQueue>,
    finished: bool,
}

impl Drop for ActiveDispatch<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let dropped = self.queue.lock().abandon();
            if dropped > 0 {
                warn!(dropped, "dispatch aborted, discarding queued requests");
            }
        }
    }
}

impl Hierarchy {
    /// Route a request through the synchronizer, if one is installed.
    pub(crate) fn request(self: &Arc<Self>, request: Request) -> Result<bool, FireError> {
        let synchronizer = self.synchronizer.read().clone();
        match synchronizer {
            Some(synchronizer) => {
                let kind = request.kind();
                let hierarchy = Arc::clone(self);
                synchronizer.dispatch(Box::new(move || hierarchy.dispatch(request)), kind)
            }
            None => self.dispatch(request),
        }
    }

    fn dispatch(self: &Arc<Self>, request: Request) -> Result<bool, FireError> {
        {
            let mut queue = self.queue.lock();
            if queue.dispatching {
                if let Some(limit) = self.config.max_queued_requests {
                    if queue.pending.len() >= limit {
                        warn!(
                            event = request.event().name(),
                            limit, "dispatch queue full, dropping request"
                        );
                        queue.overflowed = true;
                        return Ok(true);
                    }
                }
                queue.pending.push_back(request);
                debug!(pending = queue.pending.len(), "queued reentrant request");
                return Ok(true);
            }
            queue.dispatching = true;
        }

        let mut active = ActiveDispatch {
            queue: &self.queue,
            finished: false,
        };
        let outcome = self.process(request)?;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                if queue.overflowed {
                    return Err(FireError::QueueOverflow {
                        limit: self.config.max_queued_requests.unwrap_or_default(),
                    });
                }
                match queue.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        queue.dispatching = false;
                        active.finished = true;
                        break;
                    }
                }
            };
            self.process(next)?;
        }
        Ok(outcome)
    }

    fn process(self: &Arc<Self>, request: Request) -> Result<bool, FireError> {
        match request {
            Request::Fire { event, mode } => match resolve::resolve(self, &event)? {
                Resolution::Selected(selected) => {
                    execute::commit(self, selected, &event)?;
                    Ok(true)
                }
                Resolution::NotFound(not_found) => {
                    debug!(event = event.name(), ?mode, "transition not found");
                    match mode {
                        FireMode::MustSucceed => Err(not_found.into()),
                        FireMode::BestEffort => Ok(false),
                    }
                }
            },
            Request::Force { target, event } => {
                execute::force(self, &target, &event)?;
                Ok(true)
            }
        }
    }
}
