//! The fixed action catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete action the fleet can vote to execute.
///
/// Known identically by every peer; there is no runtime registration of
/// new topics (see spec Non-goals: dynamic topic catalogs are out of
/// scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Move up.
    MoveUp,
    /// Move down.
    MoveDown,
    /// Move left.
    MoveLeft,
    /// Move right.
    MoveRight,
    /// Look cute.
    LookCute,
}

impl Topic {
    /// All topics in the catalog, in a stable order.
    pub const ALL: [Topic; 5] = [
        Topic::MoveUp,
        Topic::MoveDown,
        Topic::MoveLeft,
        Topic::MoveRight,
        Topic::LookCute,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::MoveUp => "MoveUp",
            Topic::MoveDown => "MoveDown",
            Topic::MoveLeft => "MoveLeft",
            Topic::MoveRight => "MoveRight",
            Topic::LookCute => "LookCute",
        };
        write!(f, "{name}")
    }
}
