//! Snapshot and restore of a hierarchy's active configuration.
//!
//! A snapshot is a compact string `"<version>:<path>"`. The path holds one
//! state identifier per active level, outermost first, separated by `/`.
//! Only current-state pointers are captured; transitions, handlers, and user
//! data are part of the program and are not serialized.

use crate::core::{State, StateMachine};

pub mod error;
mod path;

pub use error::SerializationError;
pub use path::PathSerializer;

/// Version identifier for the snapshot format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Separates the version tag from the path.
pub const VERSION_SEPARATOR: char = ':';

/// Separates per-level identifiers within the path.
pub const PATH_SEPARATOR: char = '/';

/// Converts between a machine's active configuration and a string.
///
/// `deserialize` only resolves the string into a root-first path of states;
/// the machine validates the path against its actual nesting and relocates
/// the current-state pointers itself, without running any handler.
pub trait StateMachineSerializer: Send + Sync {
    fn serialize(&self, machine: &StateMachine) -> Result<String, SerializationError>;

    fn deserialize(
        &self,
        machine: &StateMachine,
        serialized: &str,
    ) -> Result<Vec<State>, SerializationError>;
}
