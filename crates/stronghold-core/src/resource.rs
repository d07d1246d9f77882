//! Kingdom resources tracked by the shared session document.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric resource a check outcome can adjust.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    ResourcePoints,
    Food,
    Lumber,
    Ore,
    Stone,
    Luxuries,
    Fame,
    Unrest,
    Xp,
}

impl Resource {
    /// Stable snake_case key, matching the serde representation. Used for
    /// resolution-data keys like `dice:resource_points`.
    #[must_use]
    pub fn as_key(self) -> &'static str {
        match self {
            Self::ResourcePoints => "resource_points",
            Self::Food => "food",
            Self::Lumber => "lumber",
            Self::Ore => "ore",
            Self::Stone => "stone",
            Self::Luxuries => "luxuries",
            Self::Fame => "fame",
            Self::Unrest => "unrest",
            Self::Xp => "xp",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResourcePoints => "resource points",
            Self::Food => "food",
            Self::Lumber => "lumber",
            Self::Ore => "ore",
            Self::Stone => "stone",
            Self::Luxuries => "luxuries",
            Self::Fame => "fame",
            Self::Unrest => "unrest",
            Self::Xp => "xp",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_serializes_snake_case() {
        let json = serde_json::to_string(&Resource::ResourcePoints).unwrap();
        assert_eq!(json, "\"resource_points\"");
    }
}
