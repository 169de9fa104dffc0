//! The default `"<version>:<id>/<id>/..."` snapshot format.

use super::{
    SerializationError, StateMachineSerializer, CHECKPOINT_VERSION, PATH_SEPARATOR,
    VERSION_SEPARATOR,
};
use crate::core::{State, StateMachine};

/// Serializes the active configuration as a path of state identifiers.
///
/// # Example
///
/// ```rust
/// use statecraft::{Event, StateMachine};
///
/// let machine = StateMachine::new("sm");
/// let idle = machine.create_state("idle");
/// let running = machine.create_state("running");
/// let phase = running.create_child_state_machine("phase").unwrap();
/// phase.create_state("warmup");
/// let steady = phase.create_state("steady");
///
/// machine.force_transition(&steady, &Event::new("restore")).unwrap();
/// let snapshot = machine.serialize().unwrap();
/// assert_eq!(snapshot, "1:running/steady");
///
/// machine.reset();
/// assert_eq!(machine.current_state(), Some(idle));
/// machine.deserialize(&snapshot).unwrap();
/// assert_eq!(machine.current_child_state(), Some(steady));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct PathSerializer;

impl StateMachineSerializer for PathSerializer {
    fn serialize(&self, machine: &StateMachine) -> Result<String, SerializationError> {
        let mut segments = Vec::new();
        let mut level = Some(machine.clone());
        while let Some(current) = level.as_ref().and_then(StateMachine::current_state) {
            segments.push(current.identifier().to_string());
            level = current.child_state_machine();
        }
        if segments.is_empty() {
            return Err(SerializationError::Uninitialized {
                machine: machine.name().to_string(),
            });
        }
        let separator = PATH_SEPARATOR.to_string();
        Ok(format!(
            "{CHECKPOINT_VERSION}{VERSION_SEPARATOR}{}",
            segments.join(separator.as_str())
        ))
    }

    fn deserialize(
        &self,
        machine: &StateMachine,
        serialized: &str,
    ) -> Result<Vec<State>, SerializationError> {
        let (version, path) = serialized
            .split_once(VERSION_SEPARATOR)
            .ok_or(SerializationError::MissingVersion)?;
        let found: u32 = version
            .trim()
            .parse()
            .map_err(|_| SerializationError::InvalidVersion(version.to_string()))?;
        if found != CHECKPOINT_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                found,
                supported: CHECKPOINT_VERSION,
            });
        }
        if path.is_empty() {
            return Ok(Vec::new());
        }
        path.split(PATH_SEPARATOR)
            .map(|identifier| {
                machine
                    .state_by_identifier(identifier)
                    .ok_or_else(|| SerializationError::UnknownIdentifier {
                        identifier: identifier.to_string(),
                    })
            })
            .collect()
    }
}
