// Catalog loader: memory cache, durable cache, fetch, fallback.
//
// Each `load()` takes a new generation number before it suspends. When the
// fetch completes, the result is published only if no newer load has
// started in the meantime; otherwise it is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gambit_core::catalog::{fallback_players, CatalogSource, FetchError, PlayerCatalog};
use gambit_core::player::Player;
use gambit_core::store::{forget, load_json, persist, KeyValueStore, CATALOG_CACHE_KEY};

/// Upper bound on the cache TTL, about a century.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 3600;

/// Snapshot written to memory and to `gf_catalog_cache`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCatalog {
    fetched_at: DateTime<Utc>,
    count: usize,
    players: Vec<Player>,
}

impl CachedCatalog {
    fn is_fresh(&self, count: usize, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.count == count && !self.players.is_empty() && now - self.fetched_at < ttl
    }
}

/// Where a load's players came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    MemoryCache,
    StoredCache,
    Fetched,
    Fallback,
    /// A newer load started first; nothing was published.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct CatalogLoad {
    pub catalog: PlayerCatalog,
    pub origin: CatalogOrigin,
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub count: usize,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

pub struct CatalogLoader {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn KeyValueStore>,
    settings: LoaderSettings,
    memory: Mutex<Option<CachedCatalog>>,
    generation: AtomicU64,
    tx: watch::Sender<PlayerCatalog>,
}

impl CatalogLoader {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn KeyValueStore>,
        settings: LoaderSettings,
    ) -> Self {
        let (tx, _) = watch::channel(PlayerCatalog::loading());
        Self {
            source,
            store,
            settings,
            memory: Mutex::new(None),
            generation: AtomicU64::new(0),
            tx,
        }
    }

    /// The most recently published catalog.
    pub fn current(&self) -> PlayerCatalog {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerCatalog> {
        self.tx.subscribe()
    }

    fn ttl(&self) -> chrono::Duration {
        let secs = self.settings.cache_ttl.as_secs().min(MAX_TTL_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    fn memory(&self) -> std::sync::MutexGuard<'_, Option<CachedCatalog>> {
        self.memory.lock().expect("catalog cache mutex poisoned")
    }

    /// Load the catalog and publish it to subscribers.
    pub async fn load(&self) -> CatalogLoad {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let count = self.settings.count;
        let now = Utc::now();
        let ttl = self.ttl();

        let in_memory = self.memory().clone().filter(|c| c.is_fresh(count, ttl, now));
        if let Some(cached) = in_memory {
            debug!("Catalog served from memory ({} players)", cached.players.len());
            let catalog = PlayerCatalog::ready(cached.players);
            return self.publish(generation, catalog, CatalogOrigin::MemoryCache);
        }

        if let Some(stored) = load_json::<CachedCatalog>(self.store.as_ref(), CATALOG_CACHE_KEY)
            .filter(|c| c.is_fresh(count, ttl, now))
        {
            info!("Catalog served from stored cache ({} players)", stored.players.len());
            let catalog = PlayerCatalog::ready(stored.players.clone());
            *self.memory() = Some(stored);
            return self.publish(generation, catalog, CatalogOrigin::StoredCache);
        }

        self.tx.send_replace(PlayerCatalog::loading());

        let fetched = match tokio::time::timeout(
            self.settings.request_timeout,
            self.source.fetch_top(count),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding catalog load {} (superseded)", generation);
            return CatalogLoad {
                catalog: self.current(),
                origin: CatalogOrigin::Superseded,
            };
        }

        match fetched {
            Ok(players) if !players.is_empty() => {
                info!(
                    "Fetched {} players from {}",
                    players.len(),
                    self.source.name()
                );
                let cached = CachedCatalog {
                    fetched_at: Utc::now(),
                    count,
                    players,
                };
                persist(self.store.as_ref(), CATALOG_CACHE_KEY, &cached);
                let catalog = PlayerCatalog::ready(cached.players.clone());
                *self.memory() = Some(cached);
                self.publish(generation, catalog, CatalogOrigin::Fetched)
            }
            Ok(_) => {
                warn!("{} returned no players, using fallback list", self.source.name());
                self.publish_fallback(generation)
            }
            Err(e) => {
                warn!(
                    "Catalog fetch from {} failed ({}), using fallback list",
                    self.source.name(),
                    e
                );
                self.publish_fallback(generation)
            }
        }
    }

    /// Drop both cache layers so the next load fetches.
    pub fn invalidate(&self) {
        *self.memory() = None;
        forget(self.store.as_ref(), CATALOG_CACHE_KEY);
    }

    fn publish_fallback(&self, generation: u64) -> CatalogLoad {
        let catalog = PlayerCatalog::ready(fallback_players());
        self.publish(generation, catalog, CatalogOrigin::Fallback)
    }

    fn publish(&self, generation: u64, catalog: PlayerCatalog, origin: CatalogOrigin) -> CatalogLoad {
        if self.generation.load(Ordering::SeqCst) != generation {
            return CatalogLoad {
                catalog: self.current(),
                origin: CatalogOrigin::Superseded,
            };
        }
        self.tx.send_replace(catalog.clone());
        CatalogLoad { catalog, origin }
    }
}
