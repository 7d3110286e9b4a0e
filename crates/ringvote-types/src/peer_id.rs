//! Peer identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable integer id identifying one peer within a run.
///
/// Ids are assigned externally (CLI positional argument or config file)
/// and are unique within a fleet; nothing in this crate enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(u64);

impl PeerId {
    /// Creates a peer id from a raw integer.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn peer_id_display() {
        assert_eq!(PeerId::new(3).to_string(), "3");
    }

    #[test]
    fn peer_id_roundtrips_through_json() {
        let id = PeerId::new(42);
        let encoded = serde_json::to_string(&id).unwrap();
        assert_eq!(encoded, "42");
        let decoded: PeerId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, id);
    }
}
