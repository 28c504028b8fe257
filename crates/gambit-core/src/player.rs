// Player cards as listed in a catalog snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a chess player card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        PlayerId(s)
    }
}

/// A chess player card. Read-only once listed in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// Display name (full name when known, otherwise the account name).
    pub name: String,
    /// Classical rating used for tier assignment.
    pub rating: u32,
    /// ISO country code. Empty if unknown.
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Market value in value units, derived from the player's rank.
    #[serde(default)]
    pub value: f64,
}

impl Player {
    pub fn new(id: &str, name: &str, rating: u32, country: &str) -> Self {
        Player {
            id: PlayerId::new(id),
            name: name.to_string(),
            rating,
            country: country.to_string(),
            image_url: None,
            value: 0.0,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rating)
    }
}
