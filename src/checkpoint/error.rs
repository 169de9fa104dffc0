//! Snapshot format errors.

use thiserror::Error;

/// Errors raised while serializing or restoring a snapshot.
///
/// A failed restore leaves the hierarchy's configuration unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// The machine has no current state to record
    #[error("State machine '{machine}' has no current state to serialize")]
    Uninitialized { machine: String },

    /// The machine's parent state is not active, so it holds no configuration
    #[error("State machine '{machine}' is not active and cannot be restored")]
    Inactive { machine: String },

    #[error("Serialized state machine is missing its version prefix")]
    MissingVersion,

    #[error("Serialized state machine has a malformed version '{0}'")]
    InvalidVersion(String),

    /// Snapshot version is not supported by this version
    #[error("Unsupported snapshot version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("No state with identifier '{identifier}' exists in this hierarchy")]
    UnknownIdentifier { identifier: String },

    #[error("State '{identifier}' does not belong to state machine '{machine}'")]
    WrongMachine { identifier: String, machine: String },

    /// More segments than active nested levels
    #[error("Unexpected segment '{identifier}': the preceding state has no child state machine")]
    OverSpecified { identifier: String },

    /// Fewer segments than active nested levels
    #[error("Serialized path ends before reaching state machine '{machine}'")]
    UnderSpecified { machine: String },
}
