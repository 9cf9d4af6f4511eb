use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique token naming one optimistic invocation's overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTag(Uuid);

impl OverrideTag {
    /// Creates a new random tag.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OverrideTag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverrideTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
