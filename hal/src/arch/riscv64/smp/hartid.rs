//! # Hart IDs
//!
//! The kernel learns its hart ID from the boot firmware (`a0` at entry) and
//! hands it to the per-hart trap objects. Nothing here reads `tp`: that
//! register belongs to user code once a context has been restored.

use core::fmt;

/// Hart ID type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HartId(usize);

impl HartId {
    /// Create a new HartId
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the raw hart ID value
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl From<usize> for HartId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl From<HartId> for usize {
    fn from(id: HartId) -> Self {
        id.0
    }
}

impl fmt::Display for HartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hart{}", self.0)
    }
}
