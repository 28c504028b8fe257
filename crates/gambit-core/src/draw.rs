// Pack draw engine: tiered weighted sampling with pool fallback.
//
// Drawing is a pure function of the pack configuration, the catalog snapshot,
// and an injected random source. Nothing here touches persisted state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::pack::{PackConfig, PackId};
use crate::player::Player;
use crate::tier::{Tier, LEGENDARY_MIN_RATING};

/// Number of cards in the starter pack: two distinct players, first repeated.
pub const STARTER_CARD_COUNT: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum DrawError {
    #[error("cannot open a pack from an empty catalog")]
    EmptyCatalog,
    #[error("starter pack needs at least 2 distinct players, catalog has {available}")]
    NotEnoughPlayers { available: usize },
}

// ---------------------------------------------------------------------------
// Random source
// ---------------------------------------------------------------------------

/// Randomness capability consumed by the draw engine.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize;
}

/// `StdRng`-backed source, seeded from entropy or a fixed seed.
#[derive(Debug, Clone)]
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed script of unit samples and indices, cycling when exhausted.
/// Indices are reduced modulo the requested length.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    units: Vec<f64>,
    indices: Vec<usize>,
    unit_pos: usize,
    index_pos: usize,
}

impl ScriptedRandom {
    pub fn new(units: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            units,
            indices,
            unit_pos: 0,
            index_pos: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.units.is_empty() {
            return 0.0;
        }
        let v = self.units[self.unit_pos % self.units.len()];
        self.unit_pos += 1;
        v
    }

    fn next_index(&mut self, len: usize) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        let v = self.indices[self.index_pos % self.indices.len()];
        self.index_pos += 1;
        v % len
    }
}

// ---------------------------------------------------------------------------
// Tier pools
// ---------------------------------------------------------------------------

/// The catalog partitioned by tier, with empty tiers aliased to the nearest
/// non-empty lower tier.
#[derive(Debug)]
pub struct TierPools<'a> {
    pools: [Vec<&'a Player>; 5],
    /// For each tier, the tier whose pool it draws from after fallback.
    resolved: [Tier; 5],
}

impl<'a> TierPools<'a> {
    pub fn build(catalog: &'a [Player]) -> Self {
        let mut pools: [Vec<&'a Player>; 5] = Default::default();
        for player in catalog {
            pools[Tier::for_rating(player.rating).index()].push(player);
        }

        // Resolve bottom-up so a chain of empty tiers lands on the first
        // non-empty tier below them.
        let mut resolved = Tier::ALL;
        for tier in Tier::ALL.iter().rev() {
            if pools[tier.index()].is_empty() {
                if let Some(lower) = tier.next_lower() {
                    resolved[tier.index()] = resolved[lower.index()];
                }
            }
        }

        TierPools { pools, resolved }
    }

    /// The tier `tier` draws from after fallback.
    pub fn resolve(&self, tier: Tier) -> Tier {
        self.resolved[tier.index()]
    }

    /// Players drawable for `tier` after fallback. Empty only if the catalog
    /// has nothing at or below `tier`.
    pub fn pool(&self, tier: Tier) -> &[&'a Player] {
        &self.pools[self.resolve(tier).index()]
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Select a tier for the unit sample `r` by walking the odds table.
pub fn select_tier(odds: &[(Tier, f64)], r: f64) -> Tier {
    let mut cumulative = 0.0;
    for &(tier, p) in odds {
        cumulative += p;
        if r < cumulative {
            return tier;
        }
    }
    Tier::lowest()
}

/// Open a pack of type `pack` against `catalog`.
///
/// Returns exactly `card_count` players for the pack. The starter pack uses
/// the fixed `[first, second, first]` rule instead of the odds table.
pub fn open_pack(
    pack: PackId,
    catalog: &[Player],
    rng: &mut dyn RandomSource,
) -> Result<Vec<Player>, DrawError> {
    if pack.is_starter() {
        return open_starter(catalog, rng);
    }
    draw_cards(pack.config(), catalog, rng)
}

/// Draw `config.card_count` cards using the config's tier odds.
pub fn draw_cards(
    config: &PackConfig,
    catalog: &[Player],
    rng: &mut dyn RandomSource,
) -> Result<Vec<Player>, DrawError> {
    if catalog.is_empty() {
        return Err(DrawError::EmptyCatalog);
    }

    let pools = TierPools::build(catalog);
    let mut cards = Vec::with_capacity(config.card_count);

    for _ in 0..config.card_count {
        let tier = select_tier(config.odds, rng.next_unit());
        let pool = pools.pool(tier);
        let card = if pool.is_empty() {
            // Nothing at or below the tier: take anyone.
            &catalog[rng.next_index(catalog.len())]
        } else {
            pool[rng.next_index(pool.len())]
        };
        debug!(
            "{} draw: tier {} -> {} ({})",
            config.id,
            tier,
            pools.resolve(tier),
            card.id
        );
        cards.push(card.clone());
    }

    Ok(cards)
}

/// Starter pack: two distinct players, returned as `[first, second, first]`.
///
/// Draws from players below the legendary band when more than two exist,
/// otherwise from the whole catalog.
pub fn open_starter(
    catalog: &[Player],
    rng: &mut dyn RandomSource,
) -> Result<Vec<Player>, DrawError> {
    if catalog.is_empty() {
        return Err(DrawError::EmptyCatalog);
    }

    let below_top: Vec<&Player> = catalog
        .iter()
        .filter(|p| p.rating < LEGENDARY_MIN_RATING)
        .collect();
    let pool: Vec<&Player> = if below_top.len() > 2 {
        below_top
    } else {
        catalog.iter().collect()
    };

    if pool.len() < 2 {
        return Err(DrawError::NotEnoughPlayers {
            available: pool.len(),
        });
    }

    let first = rng.next_index(pool.len());
    let mut second = rng.next_index(pool.len() - 1);
    if second >= first {
        second += 1;
    }

    let first = pool[first].clone();
    let second = pool[second].clone();
    debug!("starter draw: {} and {}", first.id, second.id);
    Ok(vec![first.clone(), second, first])
}
