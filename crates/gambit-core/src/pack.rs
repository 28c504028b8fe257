// Purchasable pack types and their draw odds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tier::Tier;

/// The closed set of pack types on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackId {
    /// One-time free introductory pack.
    Starter,
    Pawn,
    Knight,
    King,
}

/// Immutable configuration of a pack type.
#[derive(Debug, Clone, PartialEq)]
pub struct PackConfig {
    pub id: PackId,
    pub name: &'static str,
    pub description: &'static str,
    /// Price in coins. Zero only for the starter pack.
    pub price: u64,
    /// Number of cards yielded per opening.
    pub card_count: usize,
    /// Tier draw probabilities in walk order (highest tier first). Mass not
    /// covered by the table goes to `Tier::lowest()`.
    pub odds: &'static [(Tier, f64)],
}

const STARTER: PackConfig = PackConfig {
    id: PackId::Starter,
    name: "Starter Pack",
    description: "Your first step to glory. Includes a lesson on duplicates.",
    price: 0,
    card_count: 3,
    odds: &[
        (Tier::Goat, 0.0),
        (Tier::Legendary, 0.0),
        (Tier::Epic, 0.0),
        (Tier::Rare, 0.0),
        (Tier::Common, 1.0),
    ],
};

const PAWN: PackConfig = PackConfig {
    id: PackId::Pawn,
    name: "Pawn Pack",
    description: "3 cards. Ideal to get started.",
    price: 100,
    card_count: 3,
    odds: &[
        (Tier::Goat, 0.001),
        (Tier::Legendary, 0.01),
        (Tier::Epic, 0.08),
        (Tier::Rare, 0.25),
        (Tier::Common, 0.659),
    ],
};

const KNIGHT: PackConfig = PackConfig {
    id: PackId::Knight,
    name: "Knight Pack",
    description: "3 cards. Better odds.",
    price: 500,
    card_count: 3,
    odds: &[
        (Tier::Goat, 0.01),
        (Tier::Legendary, 0.05),
        (Tier::Epic, 0.20),
        (Tier::Rare, 0.40),
        (Tier::Common, 0.34),
    ],
};

const KING: PackConfig = PackConfig {
    id: PackId::King,
    name: "King Pack",
    description: "3 cards. The true elite.",
    price: 2000,
    card_count: 3,
    odds: &[
        (Tier::Goat, 0.05),
        (Tier::Legendary, 0.15),
        (Tier::Epic, 0.35),
        (Tier::Rare, 0.30),
        (Tier::Common, 0.15),
    ],
};

impl PackId {
    pub const ALL: [PackId; 4] = [PackId::Starter, PackId::Pawn, PackId::Knight, PackId::King];

    /// The static configuration for this pack type.
    pub fn config(&self) -> &'static PackConfig {
        match self {
            PackId::Starter => &STARTER,
            PackId::Pawn => &PAWN,
            PackId::Knight => &KNIGHT,
            PackId::King => &KING,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            PackId::Starter => "STARTER",
            PackId::Pawn => "PAWN",
            PackId::Knight => "KNIGHT",
            PackId::King => "KING",
        }
    }

    /// Parse a pack identifier, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "STARTER" => Some(PackId::Starter),
            "PAWN" => Some(PackId::Pawn),
            "KNIGHT" => Some(PackId::Knight),
            "KING" => Some(PackId::King),
            _ => None,
        }
    }

    pub fn is_starter(&self) -> bool {
        matches!(self, PackId::Starter)
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}
