//! Correlation identifiers for grouping the events of one invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a single boundary-level invocation (one CLI command, one
/// undo step driven by a collaborator).
///
/// Generated from UUIDv7 so identifiers sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(String);

impl InvocationId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an existing identifier, e.g. one handed in by a caller
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
