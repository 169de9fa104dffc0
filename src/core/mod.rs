//! Core state machine types.
//!
//! This module contains the static model of a hierarchy:
//! - `StateMachine` and `State` handles over a shared state graph
//! - `Event`s, decoupled from any single machine
//! - Guard predicates and the values passed to user callbacks
//! - Records of committed transitions
//!
//! Runtime behaviour (resolution, queuing, execution) lives in `dispatch`.

mod event;
pub(crate) mod graph;
mod guard;
pub(crate) mod machine;
mod record;
mod state;
pub(crate) mod transition;

pub use event::Event;
pub use guard::Guard;
pub use machine::StateMachine;
pub use record::{TransitionKind, TransitionRecord};
pub use state::State;
pub use transition::{CallbackResult, GuardInfo, SelectorInfo, StateHandlerInfo, TransitionInfo};
