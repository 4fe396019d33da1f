//! Local identity type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key assigned by the metadata store at first persistence.
///
/// Monotonically increasing and never reused, even after deletion.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(i64);

impl LocalId {
    /// Wrap a raw key value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw key value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

impl From<i64> for LocalId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_id_ordering() {
        assert!(LocalId::new(1) < LocalId::new(2));
    }

    #[test]
    fn local_id_display_and_debug() {
        let id = LocalId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{:?}", id), "LocalId(42)");
    }

    #[test]
    fn local_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&LocalId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
