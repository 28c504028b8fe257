// Owned cards.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::player::PlayerId;
use crate::store::{load_json, persist, KeyValueStore, OWNED_PLAYERS_KEY};

/// The set of owned player ids, kept in acquisition order.
pub struct Collection {
    store: Arc<dyn KeyValueStore>,
    owned: Vec<PlayerId>,
    tx: watch::Sender<Vec<PlayerId>>,
}

impl Collection {
    /// Restore from `store`. A missing or corrupt blob yields an empty
    /// collection; repeated ids in a stored blob are collapsed.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let stored: Vec<PlayerId> =
            load_json(store.as_ref(), OWNED_PLAYERS_KEY).unwrap_or_default();
        let mut owned: Vec<PlayerId> = Vec::with_capacity(stored.len());
        for id in stored {
            if !owned.contains(&id) {
                owned.push(id);
            }
        }
        let (tx, _) = watch::channel(owned.clone());
        Collection { store, owned, tx }
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.owned.contains(id)
    }

    pub fn ids(&self) -> &[PlayerId] {
        &self.owned
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<PlayerId>> {
        self.tx.subscribe()
    }

    /// Add a card. Returns `true` if it was not owned before; owning it
    /// already is a no-op.
    pub fn add_card(&mut self, id: &PlayerId) -> bool {
        if self.contains(id) {
            debug!("Duplicate card {}", id);
            return false;
        }
        self.owned.push(id.clone());
        self.commit();
        true
    }

    /// Remove a card if owned. Returns whether anything was removed.
    pub fn remove_card(&mut self, id: &PlayerId) -> bool {
        let before = self.owned.len();
        self.owned.retain(|owned| owned != id);
        if self.owned.len() == before {
            return false;
        }
        self.commit();
        true
    }

    pub fn reset(&mut self) {
        self.owned.clear();
        self.commit();
    }

    fn commit(&mut self) {
        persist(self.store.as_ref(), OWNED_PLAYERS_KEY, &self.owned);
        self.tx.send_replace(self.owned.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn id(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn persisted(store: &MemoryStore) -> Vec<PlayerId> {
        load_json(store, OWNED_PLAYERS_KEY).unwrap_or_default()
    }

    #[test]
    fn add_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut col = Collection::restore(store.clone());
        assert!(col.add_card(&id("tari")));
        assert!(!col.add_card(&id("tari")));
        assert_eq!(col.len(), 1);
        assert_eq!(persisted(&store), vec![id("tari")]);
    }

    #[test]
    fn remove_owned_card() {
        let store = Arc::new(MemoryStore::new());
        let mut col = Collection::restore(store.clone());
        col.add_card(&id("a"));
        col.add_card(&id("b"));
        assert!(col.remove_card(&id("a")));
        assert!(!col.contains(&id("a")));
        assert_eq!(persisted(&store), vec![id("b")]);
    }

    #[test]
    fn remove_unowned_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut col = Collection::restore(store.clone());
        col.add_card(&id("a"));
        let rx = col.subscribe();
        assert!(!col.remove_card(&id("zzz")));
        assert_eq!(col.ids(), &[id("a")]);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn restore_keeps_order_and_drops_repeats() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(OWNED_PLAYERS_KEY, r#"["c","a","c","b"]"#)
            .unwrap();
        let col = Collection::restore(store);
        assert_eq!(col.ids(), &[id("c"), id("a"), id("b")]);
    }

    #[test]
    fn corrupt_blob_restores_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(OWNED_PLAYERS_KEY, "42").unwrap();
        assert!(Collection::restore(store).is_empty());
    }

    #[test]
    fn reset_clears_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut col = Collection::restore(store.clone());
        col.add_card(&id("a"));
        col.reset();
        assert!(col.is_empty());
        assert!(persisted(&store).is_empty());
    }
}
