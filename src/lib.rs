//! Statecraft: hierarchical state machines with reentrant event dispatch
//!
//! A hierarchy is built from a top-level [`StateMachine`], its [`State`]s,
//! and child machines owned by individual states. [`Event`]s are independent
//! of any machine and are bound to a hierarchy the first time a transition
//! on them is registered.
//!
//! # Core Concepts
//!
//! - **Resolution**: an event is offered to the deepest active state first
//!   and bubbles outward; the first level with transitions for the event
//!   claims it, and the first candidate whose guard passes is selected
//! - **Reentrancy**: events fired from guards and handlers are queued and
//!   processed after the current transition completes
//! - **Snapshots**: the active configuration can be serialized to a compact
//!   string and restored without running handlers
//!
//! # Example
//!
//! ```rust
//! use statecraft::{Event, StateMachine};
//!
//! let machine = StateMachine::new("order");
//! let pending = machine.create_state("pending");
//! let active = machine.create_state("active");
//! let shipping = active.create_child_state_machine("shipping").unwrap();
//! let packing = shipping.create_state("packing");
//! let in_transit = shipping.create_state("in transit");
//!
//! let approve = Event::new("approve");
//! let dispatch = Event::new("dispatch");
//! let cancel = Event::new("cancel");
//!
//! pending.transition_on(&approve).to(&active).build().unwrap();
//! packing.transition_on(&dispatch).to(&in_transit).build().unwrap();
//! active.transition_on(&cancel).to(&pending).build().unwrap();
//!
//! approve.fire().unwrap();
//! assert_eq!(machine.current_child_state(), Some(packing));
//!
//! dispatch.fire().unwrap();
//! assert_eq!(machine.serialize().unwrap(), "1:active/in transit");
//!
//! // handled by the outer level while the child machine is active
//! cancel.fire().unwrap();
//! assert_eq!(machine.current_state(), Some(pending));
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod dispatch;

// Re-export commonly used types
pub use builder::{BuildError, TransitionBuilder};
pub use checkpoint::{PathSerializer, SerializationError, StateMachineSerializer};
pub use config::MachineConfig;
pub use crate::core::{
    CallbackResult, Event, Guard, GuardInfo, SelectorInfo, State, StateHandlerInfo,
    StateMachine, TransitionInfo, TransitionKind, TransitionRecord,
};
pub use dispatch::{
    DispatchKind, DispatchWork, FireError, FireMode, LockingSynchronizer, Synchronizer,
    TransitionNotFound,
};
