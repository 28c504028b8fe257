// Rating tiers used to partition the catalog into draw pools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest rating of the goat band.
pub const GOAT_MIN_RATING: u32 = 2700;
/// Lowest rating of the legendary band.
pub const LEGENDARY_MIN_RATING: u32 = 2660;
/// Lowest rating of the epic band.
pub const EPIC_MIN_RATING: u32 = 2655;
/// Lowest rating of the rare band.
pub const RARE_MIN_RATING: u32 = 2650;

/// Rating band of a player card, ordered from highest to lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Goat,
    Legendary,
    Epic,
    Rare,
    Common,
}

impl Tier {
    /// All tiers, highest band first.
    pub const ALL: [Tier; 5] = [
        Tier::Goat,
        Tier::Legendary,
        Tier::Epic,
        Tier::Rare,
        Tier::Common,
    ];

    /// The tier a rating falls into. Bands are disjoint and cover every rating.
    pub fn for_rating(rating: u32) -> Self {
        if rating >= GOAT_MIN_RATING {
            Tier::Goat
        } else if rating >= LEGENDARY_MIN_RATING {
            Tier::Legendary
        } else if rating >= EPIC_MIN_RATING {
            Tier::Epic
        } else if rating >= RARE_MIN_RATING {
            Tier::Rare
        } else {
            Tier::Common
        }
    }

    /// The tier that absorbs residual probability mass.
    pub fn lowest() -> Self {
        Tier::Common
    }

    /// The next lower tier, or `None` for the lowest.
    pub fn next_lower(&self) -> Option<Tier> {
        match self {
            Tier::Goat => Some(Tier::Legendary),
            Tier::Legendary => Some(Tier::Epic),
            Tier::Epic => Some(Tier::Rare),
            Tier::Rare => Some(Tier::Common),
            Tier::Common => None,
        }
    }

    /// Position in `Tier::ALL` (0 = goat).
    pub fn index(&self) -> usize {
        match self {
            Tier::Goat => 0,
            Tier::Legendary => 1,
            Tier::Epic => 2,
            Tier::Rare => 3,
            Tier::Common => 4,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Tier::Goat => "goat",
            Tier::Legendary => "legendary",
            Tier::Epic => "epic",
            Tier::Rare => "rare",
            Tier::Common => "common",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.display_str())
    }
}
