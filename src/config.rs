//! Per-hierarchy configuration.

use serde::{Deserialize, Serialize};

/// Settings fixed when a top-level machine is created.
///
/// Deserializable so hosts can embed it in their own configuration:
///
/// ```rust
/// use statecraft::MachineConfig;
///
/// let config: MachineConfig = serde_json::from_str(r#"{ "max_queued_requests": 64 }"#).unwrap();
/// assert_eq!(config.max_queued_requests, Some(64));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Upper bound on requests queued by reentrant fires during one
    /// dispatch. `None` means unbounded.
    pub max_queued_requests: Option<usize>,
}

impl MachineConfig {
    /// Default settings: an unbounded request queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of requests queued by reentrant fires; further
    /// requests fail with [`FireError::QueueOverflow`](crate::FireError::QueueOverflow).
    pub fn with_max_queued_requests(mut self, limit: usize) -> Self {
        self.max_queued_requests = Some(limit);
        self
    }
}
