// Player catalog: static tables, CSV import, and the source abstraction the
// loader fetches through.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::player::{Player, PlayerId};
use crate::pricing::value_for_rank;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("catalog file {path} contains no players")]
    Empty { path: String },
}

/// Why a catalog source could not deliver players.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

/// Where catalog players come from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fetch up to `count` players, best first.
    async fn fetch_top(&self, count: usize) -> Result<Vec<Player>, FetchError>;
}

/// Serves a fixed player list.
pub struct StaticSource {
    players: Vec<Player>,
}

impl StaticSource {
    pub fn new(players: Vec<Player>) -> Self {
        StaticSource {
            players: ranked(players),
        }
    }

    pub fn builtin() -> Self {
        StaticSource {
            players: builtin_players(),
        }
    }
}

#[async_trait]
impl CatalogSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_top(&self, count: usize) -> Result<Vec<Player>, FetchError> {
        Ok(self.players.iter().take(count).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Catalog snapshot
// ---------------------------------------------------------------------------

/// The players available to draw from. While loading, the snapshot is empty
/// and packs must not be opened.
#[derive(Debug, Clone, Default)]
pub struct PlayerCatalog {
    players: Vec<Player>,
    loading: bool,
}

impl PlayerCatalog {
    /// A catalog whose fetch is still pending.
    pub fn loading() -> Self {
        PlayerCatalog {
            players: Vec::new(),
            loading: true,
        }
    }

    /// A loaded catalog. Duplicate ids keep their first occurrence.
    pub fn ready(players: Vec<Player>) -> Self {
        let mut seen = HashSet::new();
        let players: Vec<Player> = players
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        PlayerCatalog {
            players,
            loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True once loaded with at least one player.
    pub fn is_ready(&self) -> bool {
        !self.loading && !self.players.is_empty()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn find(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }
}

/// Sort best-rated first and assign market values by rank.
pub fn ranked(mut players: Vec<Player>) -> Vec<Player> {
    players.sort_by(|a, b| b.rating.cmp(&a.rating));
    for (i, player) in players.iter_mut().enumerate() {
        player.value = value_for_rank(i + 1);
    }
    players
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// (id, name, rating, country)
const BUILTIN_TABLE: &[(&str, &str, u32, &str)] = &[
    ("shanglei-lu", "Shanglei Lu", 2643, "CN"),
    ("v-pranav", "V Pranav", 2641, "IN"),
    ("vladislav-artemiev", "Vladislav Artemiev", 2641, "RU"),
    ("kirill-alekseenko", "Kirill Alekseenko", 2639, "AT"),
    ("raunak-sadhwani", "Raunak Sadhwani", 2638, "IN"),
    ("velimir-ivic", "Velimir Ivic", 2637, "RS"),
    ("aryan-tari", "Aryan Tari", 2637, "NO"),
    ("david-navara", "David Navara", 2635, "CZ"),
    ("a-r-saleh-salem", "A.R. Saleh Salem", 2635, "AE"),
    ("aleksandar-indjic", "Aleksandar Indjic", 2635, "RS"),
    ("michael-adams", "Michael Adams", 2634, "GB"),
    ("erwin-lami", "Erwin L'Ami", 2634, "NL"),
    ("vladimir-malakhov", "Vladimir Malakhov", 2634, "RU"),
    ("ruslan-ponomariov", "Ruslan Ponomariov", 2633, "UA"),
    ("bassem-amin", "Bassem Amin", 2633, "EG"),
    ("etienne-bacrot", "Etienne Bacrot", 2630, "FR"),
    ("dmitrij-kollars", "Dmitrij Kollars", 2630, "DE"),
    ("boris-gelfand", "Boris Gelfand", 2630, "IL"),
    ("abhimanyu-mishra", "Abhimanyu Mishra", 2629, "US"),
    ("jonas-buhl-bjerre", "Jonas Buhl Bjerre", 2628, "DK"),
];

/// Substituted when a remote fetch fails.
const FALLBACK_TABLE: &[(&str, &str, u32, &str)] = &[
    ("magnuscarlsen", "Magnus Carlsen", 2830, "NO"),
    ("fabianocaruana", "Fabiano Caruana", 2805, "US"),
    ("dingliren", "Ding Liren", 2780, "CN"),
    ("iannepo", "Ian Nepomniachtchi", 2770, "RU"),
    ("hikarunakamura", "Hikaru Nakamura", 2765, "US"),
    ("alirezafirouzja", "Alireza Firouzja", 2760, "FR"),
    ("wesleyso", "Wesley So", 2755, "US"),
    ("levonaronian", "Levon Aronian", 2750, "US"),
    ("mvl", "Maxime Vachier-Lagrave", 2745, "FR"),
    ("anishgiri", "Anish Giri", 2740, "NL"),
    ("vishy", "Viswanathan Anand", 2735, "IN"),
    ("shakhriyar", "Shakhriyar Mamedyarov", 2730, "AZ"),
    ("teimour", "Teimour Radjabov", 2725, "AZ"),
    ("grischuk", "Alexander Grischuk", 2720, "RU"),
    ("rapport", "Richard Rapport", 2715, "RO"),
];

fn from_table(table: &[(&str, &str, u32, &str)]) -> Vec<Player> {
    ranked(
        table
            .iter()
            .map(|&(id, name, rating, country)| Player::new(id, name, rating, country))
            .collect(),
    )
}

/// The compiled-in catalog: 20 players rated 2628–2643.
pub fn builtin_players() -> Vec<Player> {
    from_table(BUILTIN_TABLE)
}

/// Well-known top players used when the ranking service is unavailable.
pub fn fallback_players() -> Vec<Player> {
    from_table(FALLBACK_TABLE)
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: String,
    name: String,
    rating: u32,
    #[serde(default)]
    country: String,
    #[serde(default)]
    image_url: Option<String>,
}

fn load_csv_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(row) => {
                let id = row.id.trim();
                if id.is_empty() {
                    warn!("skipping catalog row without id: '{}'", row.name.trim());
                    continue;
                }
                players.push(Player {
                    id: PlayerId::new(id),
                    name: row.name.trim().to_string(),
                    rating: row.rating,
                    country: row.country.trim().to_uppercase(),
                    image_url: row.image_url.filter(|u| !u.trim().is_empty()),
                    value: 0.0,
                });
            }
            Err(e) => {
                warn!("skipping malformed catalog row: {}", e);
            }
        }
    }
    Ok(players)
}

/// Load a catalog from a CSV file with `id,name,rating,country,image_url`
/// columns. Players are ranked by rating and valued by rank.
pub fn load_csv(path: &Path) -> Result<Vec<Player>, CatalogError> {
    let shown = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
        path: shown.clone(),
        source,
    })?;
    let players = load_csv_from_reader(file).map_err(|source| CatalogError::Csv {
        path: shown.clone(),
        source,
    })?;
    if players.is_empty() {
        return Err(CatalogError::Empty { path: shown });
    }
    info!("Loaded {} players from {}", players.len(), shown);
    Ok(ranked(players))
}
