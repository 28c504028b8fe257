// User profile and coin balance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::{load_json, persist, KeyValueStore, USER_KEY};

/// Default display name for a fresh profile.
pub const DEFAULT_USERNAME: &str = "Guest Player";

/// Persisted profile: display name, economy snapshot, onboarding flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    /// Spendable coins. Never negative by construction.
    #[serde(alias = "budget")]
    pub balance: u64,
    /// Lifetime score. Only grows, except on reset.
    #[serde(default)]
    pub total_points: u64,
    /// Set once the starter pack has been claimed.
    #[serde(default)]
    pub onboarded: bool,
}

impl UserProfile {
    pub fn new(username: &str, starting_balance: u64) -> Self {
        UserProfile {
            username: username.to_string(),
            balance: starting_balance,
            total_points: 0,
            onboarded: false,
        }
    }

    fn is_valid(&self) -> bool {
        !self.username.trim().is_empty()
    }
}

/// Defaults used when the profile is missing, corrupt, or reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDefaults {
    pub username: String,
    pub starting_balance: u64,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        ProfileDefaults {
            username: DEFAULT_USERNAME.to_string(),
            starting_balance: 2500,
        }
    }
}

impl ProfileDefaults {
    fn profile(&self) -> UserProfile {
        UserProfile::new(&self.username, self.starting_balance)
    }
}

/// Holds the profile; every mutation persists `gf_user` and notifies
/// subscribers before returning.
pub struct Economy {
    store: Arc<dyn KeyValueStore>,
    defaults: ProfileDefaults,
    profile: UserProfile,
    tx: watch::Sender<UserProfile>,
}

impl Economy {
    /// Restore the profile from `store`, seeding defaults when it is absent
    /// or fails validation.
    pub fn restore(store: Arc<dyn KeyValueStore>, defaults: ProfileDefaults) -> Self {
        let profile = match load_json::<UserProfile>(store.as_ref(), USER_KEY) {
            Some(p) if p.is_valid() => p,
            Some(_) => {
                warn!("Stored profile failed validation, re-seeding defaults");
                let p = defaults.profile();
                persist(store.as_ref(), USER_KEY, &p);
                p
            }
            None => {
                let p = defaults.profile();
                persist(store.as_ref(), USER_KEY, &p);
                p
            }
        };
        let (tx, _) = watch::channel(profile.clone());
        Economy {
            store,
            defaults,
            profile,
            tx,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn balance(&self) -> u64 {
        self.profile.balance
    }

    pub fn total_points(&self) -> u64 {
        self.profile.total_points
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        self.profile.balance >= amount
    }

    /// Receive a snapshot after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<UserProfile> {
        self.tx.subscribe()
    }

    /// Add `amount` coins unconditionally.
    pub fn credit(&mut self, amount: u64) {
        self.profile.balance = self.profile.balance.saturating_add(amount);
        self.commit();
    }

    /// Remove `amount` coins if the balance covers it. Returns `false` and
    /// leaves the balance untouched otherwise.
    pub fn debit(&mut self, amount: u64) -> bool {
        if self.profile.balance < amount {
            return false;
        }
        self.profile.balance -= amount;
        self.commit();
        true
    }

    /// Add to the lifetime score.
    pub fn add_points(&mut self, points: u64) {
        self.profile.total_points = self.profile.total_points.saturating_add(points);
        self.commit();
    }

    /// Rename the profile. Blank names are ignored and reported as `false`.
    pub fn set_username(&mut self, username: &str) -> bool {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.profile.username = trimmed.to_string();
        self.commit();
        true
    }

    pub fn complete_onboarding(&mut self) {
        if self.profile.onboarded {
            return;
        }
        self.profile.onboarded = true;
        self.commit();
    }

    /// Restore defaults and persist them.
    pub fn reset(&mut self) {
        self.profile = self.defaults.profile();
        info!("Profile reset to defaults");
        self.commit();
    }

    fn commit(&mut self) {
        persist(self.store.as_ref(), USER_KEY, &self.profile);
        self.tx.send_replace(self.profile.clone());
    }
}
