// Active lineup and captain.
//
// Both sub-stores share one invariant: lineup members and the captain are
// owned cards. `add_to_team` checks ownership against the collection;
// `set_captain` checks lineup membership.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::collection::Collection;
use crate::player::PlayerId;
use crate::store::{forget, load_json, persist, KeyValueStore, CAPTAIN_KEY, CURRENT_TEAM_KEY};

/// Maximum lineup size.
pub const TEAM_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("player is already in the team")]
    AlreadyInTeam,
    #[error("team is full (maximum {} players)", TEAM_CAPACITY)]
    TeamFull,
    #[error("you must own this player before adding them to the team")]
    NotOwned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptainError {
    #[error("the captain must be in the team")]
    NotInTeam,
}

/// Lineup and captain as seen by subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub team: Vec<PlayerId>,
    pub captain: Option<PlayerId>,
}

pub struct Roster {
    store: Arc<dyn KeyValueStore>,
    lineup: Lineup,
    tx: watch::Sender<Lineup>,
}

impl Roster {
    /// Restore lineup and captain from their own keys. Stored lineups longer
    /// than `TEAM_CAPACITY` are truncated.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let mut team: Vec<PlayerId> =
            load_json(&*store, CURRENT_TEAM_KEY).unwrap_or_default();
        if team.len() > TEAM_CAPACITY {
            warn!(
                "Stored team has {} players, keeping the first {}",
                team.len(),
                TEAM_CAPACITY
            );
            team.truncate(TEAM_CAPACITY);
        }
        let captain: Option<PlayerId> = load_json(&*store, CAPTAIN_KEY);
        let lineup = Lineup { team, captain };
        let (tx, _) = watch::channel(lineup.clone());
        Roster { store, lineup, tx }
    }

    pub fn team(&self) -> &[PlayerId] {
        &self.lineup.team
    }

    pub fn captain(&self) -> Option<&PlayerId> {
        self.lineup.captain.as_ref()
    }

    pub fn lineup(&self) -> &Lineup {
        &self.lineup
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.lineup.team.contains(id)
    }

    pub fn is_full(&self) -> bool {
        self.lineup.team.len() >= TEAM_CAPACITY
    }

    pub fn subscribe(&self) -> watch::Receiver<Lineup> {
        self.tx.subscribe()
    }

    /// Append an owned player to the lineup.
    pub fn add_to_team(&mut self, id: &PlayerId, owned: &Collection) -> Result<(), RosterError> {
        if self.contains(id) {
            return Err(RosterError::AlreadyInTeam);
        }
        if self.is_full() {
            return Err(RosterError::TeamFull);
        }
        if !owned.contains(id) {
            return Err(RosterError::NotOwned);
        }
        self.lineup.team.push(id.clone());
        self.save_team();
        self.notify();
        Ok(())
    }

    /// Drop `id` from the lineup and clear the captain if it was `id`.
    ///
    /// The captain is checked even when `id` is not in the lineup, since
    /// `set_team` can leave a captain outside it. Returns whether the lineup
    /// changed.
    pub fn remove_from_team(&mut self, id: &PlayerId) -> bool {
        let before = self.lineup.team.len();
        self.lineup.team.retain(|member| member != id);
        let removed = self.lineup.team.len() != before;
        if removed {
            self.save_team();
        }
        let was_captain = self.lineup.captain.as_ref() == Some(id);
        if was_captain {
            self.lineup.captain = None;
            self.save_captain();
        }
        if removed || was_captain {
            self.notify();
        }
        removed
    }

    /// Replace the lineup wholesale, keeping the first `TEAM_CAPACITY` ids.
    ///
    /// Ownership is not re-checked and a captain missing from the new lineup
    /// is left in place.
    pub fn set_team(&mut self, ids: &[PlayerId]) {
        self.lineup.team = ids.iter().take(TEAM_CAPACITY).cloned().collect();
        self.save_team();
        self.notify();
    }

    /// Set or clear the captain. A non-null captain must be in the lineup.
    pub fn set_captain(&mut self, id: Option<&PlayerId>) -> Result<(), CaptainError> {
        if let Some(id) = id {
            if !self.contains(id) {
                return Err(CaptainError::NotInTeam);
            }
        }
        self.lineup.captain = id.cloned();
        self.save_captain();
        self.notify();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.lineup = Lineup::default();
        self.save_team();
        self.save_captain();
        info!("Team and captain cleared");
        self.notify();
    }

    fn save_team(&self) {
        persist(self.store.as_ref(), CURRENT_TEAM_KEY, &self.lineup.team);
    }

    fn save_captain(&self) {
        match &self.lineup.captain {
            Some(id) => persist(self.store.as_ref(), CAPTAIN_KEY, id),
            None => forget(self.store.as_ref(), CAPTAIN_KEY),
        }
    }

    fn notify(&self) {
        self.tx.send_replace(self.lineup.clone());
    }
}
