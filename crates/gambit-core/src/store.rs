// Key-value persistence contract shared by all session stores.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Profile and economy snapshot.
pub const USER_KEY: &str = "gf_user";
/// Owned card identifiers.
pub const OWNED_PLAYERS_KEY: &str = "gf_owned_players";
/// Current lineup.
pub const CURRENT_TEAM_KEY: &str = "gf_current_team";
/// Captain identifier. Absent when no captain is set.
pub const CAPTAIN_KEY: &str = "gf_captain";
/// Recent match records.
pub const RECENT_MATCHES_KEY: &str = "gf_recent_matches";
/// Durable copy of the last successful remote catalog fetch.
pub const CATALOG_CACHE_KEY: &str = "gf_catalog_cache";

/// Every key owned by session state. Cleared by a full reset.
pub const SESSION_KEYS: [&str; 5] = [
    USER_KEY,
    OWNED_PLAYERS_KEY,
    CURRENT_TEAM_KEY,
    CAPTAIN_KEY,
    RECENT_MATCHES_KEY,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to serialize value for key `{key}`: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

/// Blob storage keyed by string. Each key is written independently; there
/// are no transactions across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode `key`. Missing, unreadable, or undecodable blobs all
/// yield `None`; corruption is logged, never surfaced.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read `{}` from storage, using default: {}", key, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding corrupt `{}` blob: {}", key, e);
            None
        }
    }
}

/// Encode `value` as JSON and write it under `key`.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &json)
}

/// Write `value` under `key`, logging instead of failing. Store mutations
/// use this so an unavailable backend never blocks an in-memory transition.
pub fn persist<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    if let Err(e) = save_json(store, key, value) {
        warn!("Failed to persist `{}`: {}", key, e);
    }
}

/// Remove `key`, logging instead of failing.
pub fn forget(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!("Failed to remove `{}`: {}", key, e);
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local store. Used by tests and sessions that should not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}
