// Game session: the economy, collection, roster, and match history wired
// to one store, plus the compound operations that span them.
//
// Every compound operation checks all of its preconditions before the first
// mutation, so a failed purchase or sale leaves no partial state behind.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::PlayerCatalog;
use crate::collection::Collection;
use crate::config::Config;
use crate::draw::{self, DrawError, RandomSource};
use crate::economy::{Economy, ProfileDefaults};
use crate::matches::{MatchError, MatchHistory, MatchOutcome, MatchRecord};
use crate::pack::PackId;
use crate::player::{Player, PlayerId};
use crate::pricing::{quicksell_refund, signing_cost, MIN_VALUE};
use crate::roster::{CaptainError, Roster, RosterError};
use crate::store::{forget, KeyValueStore, SESSION_KEYS};

/// Direct signing is refused once the collection holds this many cards.
/// Pack openings are not limited.
pub const SIGNING_LIMIT: usize = 15;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum PurchaseError {
    #[error("the player catalog is still loading")]
    CatalogUnavailable,

    #[error("the starter pack has already been claimed")]
    StarterAlreadyClaimed,

    #[error("not enough coins: need {price}, have {balance}")]
    InsufficientFunds { price: u64, balance: u64 },

    #[error("player {0} is not in the catalog")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is already owned")]
    AlreadyOwned(PlayerId),

    #[error("collection is full (maximum {limit} players for direct signing)")]
    CollectionFull { limit: usize },

    #[error(transparent)]
    Draw(#[from] DrawError),
}

#[derive(Debug, Error, PartialEq)]
pub enum SellError {
    #[error("player {0} is not owned")]
    NotOwned(PlayerId),
}

// ---------------------------------------------------------------------------
// Settings and results
// ---------------------------------------------------------------------------

/// Economy knobs the session applies to every transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub profile: ProfileDefaults,
    pub coins_per_value_unit: u64,
    pub quicksell_rate: f64,
    pub refund_duplicates: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            profile: ProfileDefaults::default(),
            coins_per_value_unit: 100,
            quicksell_rate: 0.8,
            refund_duplicates: true,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        SessionSettings {
            profile: config.profile_defaults(),
            coins_per_value_unit: config.economy.coins_per_value_unit,
            quicksell_rate: config.economy.quicksell_rate,
            refund_duplicates: config.economy.refund_duplicates,
        }
    }
}

/// One card from an opened pack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawnCard {
    pub player: Player,
    /// False when the card was already owned.
    pub is_new: bool,
    /// Coins credited for a duplicate.
    pub refund: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackOpening {
    pub pack: PackId,
    pub price: u64,
    pub cards: Vec<DrawnCard>,
}

impl PackOpening {
    pub fn new_cards(&self) -> usize {
        self.cards.iter().filter(|c| c.is_new).count()
    }

    pub fn total_refund(&self) -> u64 {
        self.cards.iter().map(|c| c.refund).sum()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct GameSession {
    store: Arc<dyn KeyValueStore>,
    settings: SessionSettings,
    economy: Economy,
    collection: Collection,
    roster: Roster,
    matches: MatchHistory,
}

impl GameSession {
    /// Restore every sub-store from `store`.
    pub fn restore(store: Arc<dyn KeyValueStore>, settings: SessionSettings) -> Self {
        let economy = Economy::restore(store.clone(), settings.profile.clone());
        let collection = Collection::restore(store.clone());
        let roster = Roster::restore(store.clone());
        let matches = MatchHistory::restore(store.clone());
        info!(
            "Session restored for '{}': {} coins, {} cards, {} in team",
            economy.profile().username,
            economy.balance(),
            collection.len(),
            roster.team().len()
        );
        GameSession {
            store,
            settings,
            economy,
            collection,
            roster,
            matches,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn matches(&self) -> &MatchHistory {
        &self.matches
    }

    /// Quicksell value of a card with market value `value`.
    pub fn refund_for(&self, value: f64) -> u64 {
        quicksell_refund(
            value,
            self.settings.coins_per_value_unit,
            self.settings.quicksell_rate,
        )
    }

    // --- packs ---

    /// Buy and open `pack`.
    ///
    /// Preconditions are checked before anything changes: the catalog must be
    /// loaded, the starter pack must be unclaimed, the balance must cover the
    /// price, and the draw must succeed. Only then is the price debited and
    /// each card added; duplicates from paid packs are refunded when enabled.
    pub fn open_pack(
        &mut self,
        pack: PackId,
        catalog: &PlayerCatalog,
        rng: &mut dyn RandomSource,
    ) -> Result<PackOpening, PurchaseError> {
        if !catalog.is_ready() {
            return Err(PurchaseError::CatalogUnavailable);
        }
        if pack.is_starter() && self.economy.profile().onboarded {
            return Err(PurchaseError::StarterAlreadyClaimed);
        }
        let price = pack.config().price;
        if !self.economy.can_afford(price) {
            return Err(PurchaseError::InsufficientFunds {
                price,
                balance: self.economy.balance(),
            });
        }

        let players = draw::open_pack(pack, catalog.players(), rng)?;

        if !self.economy.debit(price) {
            return Err(PurchaseError::InsufficientFunds {
                price,
                balance: self.economy.balance(),
            });
        }

        let mut cards = Vec::with_capacity(players.len());
        for player in players {
            let is_new = self.collection.add_card(&player.id);
            let refund = if !is_new && self.settings.refund_duplicates && price > 0 {
                self.refund_for(player.value)
            } else {
                0
            };
            if refund > 0 {
                self.economy.credit(refund);
            }
            cards.push(DrawnCard {
                player,
                is_new,
                refund,
            });
        }

        if pack.is_starter() {
            self.economy.complete_onboarding();
        }

        let opening = PackOpening { pack, price, cards };
        info!(
            "Opened {} for {} coins: {} new, {} refunded, balance {}",
            pack,
            price,
            opening.new_cards(),
            opening.total_refund(),
            self.economy.balance()
        );
        Ok(opening)
    }

    // --- cards ---

    /// Sell an owned card back for its quicksell value, removing it from the
    /// team first. Cards missing from `catalog` sell at the minimum value.
    pub fn quicksell(&mut self, id: &PlayerId, catalog: &PlayerCatalog) -> Result<u64, SellError> {
        if !self.collection.contains(id) {
            return Err(SellError::NotOwned(id.clone()));
        }
        let value = match catalog.find(id) {
            Some(player) => player.value,
            None => {
                warn!("Quickselling {} without catalog entry, using minimum value", id);
                MIN_VALUE
            }
        };
        let refund = self.refund_for(value);

        self.roster.remove_from_team(id);
        self.collection.remove_card(id);
        self.economy.credit(refund);
        info!("Quicksold {} for {} coins", id, refund);
        Ok(refund)
    }

    /// Buy a catalog player outright at its signing cost. Refused once the
    /// collection holds `SIGNING_LIMIT` cards.
    pub fn sign_player(
        &mut self,
        id: &PlayerId,
        catalog: &PlayerCatalog,
    ) -> Result<Player, PurchaseError> {
        if !catalog.is_ready() {
            return Err(PurchaseError::CatalogUnavailable);
        }
        let player = catalog
            .find(id)
            .ok_or_else(|| PurchaseError::UnknownPlayer(id.clone()))?;
        if self.collection.contains(id) {
            return Err(PurchaseError::AlreadyOwned(id.clone()));
        }
        if self.collection.len() >= SIGNING_LIMIT {
            return Err(PurchaseError::CollectionFull {
                limit: SIGNING_LIMIT,
            });
        }
        let cost = signing_cost(player.value, self.settings.coins_per_value_unit);
        if !self.economy.debit(cost) {
            return Err(PurchaseError::InsufficientFunds {
                price: cost,
                balance: self.economy.balance(),
            });
        }
        self.collection.add_card(id);
        info!("Signed {} for {} coins", player.name, cost);
        Ok(player.clone())
    }

    // --- roster ---

    pub fn add_to_team(&mut self, id: &PlayerId) -> Result<(), RosterError> {
        self.roster.add_to_team(id, &self.collection)
    }

    pub fn remove_from_team(&mut self, id: &PlayerId) -> bool {
        self.roster.remove_from_team(id)
    }

    pub fn set_team(&mut self, ids: &[PlayerId]) {
        self.roster.set_team(ids)
    }

    pub fn set_captain(&mut self, id: Option<&PlayerId>) -> Result<(), CaptainError> {
        self.roster.set_captain(id)
    }

    // --- profile ---

    pub fn set_username(&mut self, username: &str) -> bool {
        self.economy.set_username(username)
    }

    pub fn complete_onboarding(&mut self) {
        self.economy.complete_onboarding()
    }

    /// Record a finished match against the current captain and add its
    /// points to the lifetime score.
    pub fn record_match(
        &mut self,
        opponent: &str,
        outcome: MatchOutcome,
        points: u64,
    ) -> Result<(), MatchError> {
        let mut record = MatchRecord::new(opponent, outcome, points);
        record.captain = self.roster.captain().cloned();
        self.matches.push(record)?;
        self.economy.add_points(points);
        Ok(())
    }

    /// Return to a fresh profile and delete every session key from the
    /// store. Only the new profile is written back; the catalog cache is
    /// left alone.
    pub fn reset_all(&mut self) {
        self.roster.reset();
        self.collection.reset();
        self.matches.reset();
        for key in SESSION_KEYS {
            forget(self.store.as_ref(), key);
        }
        self.economy.reset();
        info!("Session reset, {} keys cleared", SESSION_KEYS.len());
    }

    /// Owned players resolved against `catalog`, in acquisition order.
    /// Ids the catalog no longer lists are skipped.
    pub fn owned_players<'a>(&self, catalog: &'a PlayerCatalog) -> Vec<&'a Player> {
        self.collection
            .ids()
            .iter()
            .filter_map(|id| catalog.find(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_players;
    use crate::draw::{ScriptedRandom, StdRandom};
    use crate::economy::UserProfile;
    use crate::store::{load_json, MemoryStore, CAPTAIN_KEY, USER_KEY};

    fn session() -> (Arc<MemoryStore>, GameSession) {
        let store = Arc::new(MemoryStore::new());
        let session = GameSession::restore(store.clone(), SessionSettings::default());
        (store, session)
    }

    fn catalog() -> PlayerCatalog {
        PlayerCatalog::ready(builtin_players())
    }

    #[test]
    fn loading_catalog_refuses_purchase() {
        let (_store, mut s) = session();
        let mut rng = StdRandom::from_seed(1);
        assert_eq!(
            s.open_pack(PackId::Pawn, &PlayerCatalog::loading(), &mut rng),
            Err(PurchaseError::CatalogUnavailable)
        );
        assert_eq!(s.economy().balance(), 2500);
    }

    #[test]
    fn paid_pack_debits_and_adds_cards() {
        let (_store, mut s) = session();
        let cat = catalog();
        // Three different players.
        let mut rng = ScriptedRandom::new(vec![0.9], vec![0, 1, 2]);
        let opening = s.open_pack(PackId::Pawn, &cat, &mut rng).unwrap();
        assert_eq!(opening.cards.len(), 3);
        assert_eq!(opening.new_cards(), 3);
        assert_eq!(s.economy().balance(), 2400);
        assert_eq!(s.collection().len(), 3);
    }

    #[test]
    fn duplicate_cards_are_refunded() {
        let (_store, mut s) = session();
        let cat = catalog();
        // Same player three times.
        let mut rng = ScriptedRandom::new(vec![0.9], vec![0]);
        let opening = s.open_pack(PackId::Knight, &cat, &mut rng).unwrap();
        let top = &cat.players()[0];
        let refund = s.refund_for(top.value);
        assert_eq!(refund, 2000);
        assert_eq!(opening.new_cards(), 1);
        assert_eq!(opening.total_refund(), 2 * refund);
        assert_eq!(s.economy().balance(), 2500 - 500 + 2 * refund);
        assert_eq!(s.collection().len(), 1);
    }

    #[test]
    fn duplicate_refunds_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let settings = SessionSettings {
            refund_duplicates: false,
            ..SessionSettings::default()
        };
        let mut s = GameSession::restore(store, settings);
        let mut rng = ScriptedRandom::new(vec![0.9], vec![0]);
        let opening = s.open_pack(PackId::Pawn, &catalog(), &mut rng).unwrap();
        assert_eq!(opening.total_refund(), 0);
        assert_eq!(s.economy().balance(), 2400);
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let (store, mut s) = session();
        let cat = catalog();
        let mut rng = ScriptedRandom::new(vec![0.9], vec![0, 1, 2]);
        s.open_pack(PackId::King, &cat, &mut rng).unwrap();
        let balance = s.economy().balance();
        assert_eq!(balance, 500);
        let owned = s.collection().len();

        let err = s.open_pack(PackId::King, &cat, &mut rng).unwrap_err();
        assert_eq!(err, PurchaseError::InsufficientFunds { price: 2000, balance });
        assert_eq!(s.collection().len(), owned);
        let persisted: UserProfile = load_json(&*store, USER_KEY).unwrap();
        assert_eq!(persisted.balance, balance);
    }

    #[test]
    fn starter_pack_claimed_once() {
        let (_store, mut s) = session();
        let cat = catalog();
        let mut rng = StdRandom::from_seed(4);
        let opening = s.open_pack(PackId::Starter, &cat, &mut rng).unwrap();
        assert_eq!(opening.price, 0);
        assert_eq!(opening.cards[0].player.id, opening.cards[2].player.id);
        assert!(!opening.cards[2].is_new);
        assert_eq!(opening.total_refund(), 0);
        assert_eq!(s.economy().balance(), 2500);
        assert_eq!(s.collection().len(), 2);
        assert!(s.economy().profile().onboarded);

        assert_eq!(
            s.open_pack(PackId::Starter, &cat, &mut rng),
            Err(PurchaseError::StarterAlreadyClaimed)
        );
    }

    #[test]
    fn quicksell_refunds_and_clears_roster() {
        let (_store, mut s) = session();
        let cat = catalog();
        let top = cat.players()[0].id.clone();
        s.sign_player(&top, &cat).unwrap();
        assert_eq!(s.economy().balance(), 0);
        s.add_to_team(&top).unwrap();
        s.set_captain(Some(&top)).unwrap();

        let refund = s.quicksell(&top, &cat).unwrap();
        assert_eq!(refund, 2000);
        assert_eq!(s.economy().balance(), 2000);
        assert!(!s.collection().contains(&top));
        assert!(s.roster().team().is_empty());
        assert_eq!(s.roster().captain(), None);
    }

    #[test]
    fn quicksell_clears_captain_left_outside_team() {
        let (store, mut s) = session();
        let cat = PlayerCatalog::ready(builtin_players());
        let a = cat.players()[18].id.clone();
        let b = cat.players()[19].id.clone();
        s.collection.add_card(&a);
        s.collection.add_card(&b);
        s.add_to_team(&a).unwrap();
        s.set_captain(Some(&a)).unwrap();
        s.set_team(&[b.clone()]);
        assert_eq!(s.roster().captain(), Some(&a));

        s.quicksell(&a, &cat).unwrap();
        assert!(!s.collection().contains(&a));
        assert_eq!(s.roster().captain(), None);
        assert_eq!(s.roster().team(), &[b]);
        assert!(store.get(CAPTAIN_KEY).unwrap().is_none());
    }

    #[test]
    fn quicksell_unowned_fails() {
        let (_store, mut s) = session();
        let id = PlayerId::new("nobody");
        assert_eq!(
            s.quicksell(&id, &catalog()),
            Err(SellError::NotOwned(id.clone()))
        );
        assert_eq!(s.economy().balance(), 2500);
    }

    #[test]
    fn quicksell_uncatalogued_card_uses_minimum_value() {
        let (_store, mut s) = session();
        let id = PlayerId::new("retired");
        s.collection.add_card(&id);
        assert_eq!(s.quicksell(&id, &catalog()).unwrap(), 80);
    }

    #[test]
    fn sign_player_failures() {
        let (_store, mut s) = session();
        let cat = catalog();
        let ghost = PlayerId::new("ghost");
        assert_eq!(
            s.sign_player(&ghost, &cat),
            Err(PurchaseError::UnknownPlayer(ghost.clone()))
        );

        let first = cat.players()[0].id.clone();
        let second = cat.players()[1].id.clone();
        s.sign_player(&first, &cat).unwrap();
        assert_eq!(
            s.sign_player(&first, &cat),
            Err(PurchaseError::AlreadyOwned(first.clone()))
        );
        assert_eq!(
            s.sign_player(&second, &cat),
            Err(PurchaseError::InsufficientFunds {
                price: 2400,
                balance: 0
            })
        );
    }

    #[test]
    fn signing_stops_at_collection_limit() {
        let (_store, mut s) = session();
        let cat = catalog();
        for n in 0..SIGNING_LIMIT {
            s.collection.add_card(&PlayerId::new(format!("bench-{n}")));
        }
        let target = cat.players()[19].id.clone();
        assert_eq!(
            s.sign_player(&target, &cat),
            Err(PurchaseError::CollectionFull {
                limit: SIGNING_LIMIT
            })
        );
        assert_eq!(s.economy().balance(), 2500);
        assert!(!s.collection().contains(&target));

        // Selling one card makes room again.
        s.quicksell(&PlayerId::new("bench-0"), &cat).unwrap();
        s.sign_player(&target, &cat).unwrap();
        assert_eq!(s.collection().len(), SIGNING_LIMIT);
    }

    #[test]
    fn roster_delegates_check_ownership() {
        let (_store, mut s) = session();
        let id = PlayerId::new("stranger");
        assert_eq!(s.add_to_team(&id), Err(RosterError::NotOwned));
        assert_eq!(s.set_captain(Some(&id)), Err(CaptainError::NotInTeam));
    }

    #[test]
    fn record_match_adds_points_and_captain() {
        let (_store, mut s) = session();
        let cat = catalog();
        let id = cat.players()[19].id.clone();
        s.sign_player(&id, &cat).unwrap();
        s.add_to_team(&id).unwrap();
        s.set_captain(Some(&id)).unwrap();

        s.record_match("Rival", MatchOutcome::Win, 3).unwrap();
        s.record_match("Rival", MatchOutcome::Loss, 0).unwrap();
        assert_eq!(s.economy().total_points(), 3);
        assert_eq!(s.matches().recent().len(), 2);
        assert_eq!(s.matches().recent()[1].captain, Some(id));
        assert_eq!(
            s.record_match("Rival", MatchOutcome::Loss, 5),
            Err(MatchError::PointsOnLoss)
        );
        assert_eq!(s.economy().total_points(), 3);
    }

    #[test]
    fn reset_all_restores_fresh_profile() {
        let (store, mut s) = session();
        let cat = catalog();
        let mut rng = StdRandom::from_seed(8);
        s.open_pack(PackId::Starter, &cat, &mut rng).unwrap();
        let owned = s.collection().ids()[0].clone();
        s.add_to_team(&owned).unwrap();
        s.set_captain(Some(&owned)).unwrap();
        s.set_username("Capablanca");

        s.reset_all();
        assert_eq!(s.economy().profile(), &UserProfile::new("Guest Player", 2500));
        assert!(s.collection().is_empty());
        assert!(s.roster().team().is_empty());

        let restored = GameSession::restore(store, SessionSettings::default());
        assert!(restored.collection().is_empty());
        assert_eq!(restored.roster().captain(), None);
        assert!(!restored.economy().profile().onboarded);
    }

    #[test]
    fn owned_players_skips_unknown_ids() {
        let (_store, mut s) = session();
        let cat = catalog();
        s.collection.add_card(&PlayerId::new("gone"));
        s.collection.add_card(&cat.players()[3].id);
        let owned = s.owned_players(&cat);
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, cat.players()[3].id);
    }
}
