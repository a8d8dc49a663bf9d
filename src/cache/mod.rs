//! In-process query cache with explicit invalidation.
//!
//! Every read through the services goes through [`QueryCache::get_or_fetch`].
//! Entries are grouped by [`Collection`]; a mutation marks whole collections
//! stale (see [`invalidation`]) so the next read refetches. Each collection
//! carries a generation counter: a fetch that was started before an
//! invalidation stores its result as stale, so a slow response can never
//! mask a newer write.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::ServiceError;

pub mod invalidation;
pub mod key;

pub use invalidation::{Entity, InvalidationPlan, Mutation, MutationKind};
pub use key::{KeyScope, QueryKey};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache miss")]
    Miss,
}

/// Groups of cached queries that are invalidated together.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Brands,
    Colors,
    Materials,
    Spools,
    Inventory,
    InventoryInUse,
    Dashboard,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    generation: u64,
    stale: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<QueryKey, CacheEntry>,
    generations: HashMap<Collection, u64>,
}

impl CacheState {
    fn generation(&self, collection: Collection) -> u64 {
        self.generations.get(&collection).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
    pub entries: usize,
    pub stale_entries: usize,
}

/// Shared handle to the cache. Clones point at the same storage.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    state: Arc<RwLock<CacheState>>,
    counters: Arc<Counters>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the fresh cached value for `key`, or runs `fetch` and caches
    /// its result.
    ///
    /// A failed fetch leaves the cache untouched: any last-known-good value
    /// stays in place (still stale) and the error is returned as is.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        match self.peek::<T>(&key) {
            Ok(value) => {
                self.record_hit(&key);
                return Ok(value);
            }
            Err(CacheError::Serialization(err)) => {
                warn!(key = %key, error = %err, "Cached value did not match requested type");
            }
            Err(CacheError::Miss) => {}
        }

        self.record_miss(&key);
        let generation = self.read().generation(key.collection);

        let value = fetch().await.map_err(|err| {
            warn!(key = %key, error = %err, "Fetch failed; cache left unchanged");
            err
        })?;

        let json = serde_json::to_value(&value)?;
        let mut state = self.write();
        let stale = state.generation(key.collection) != generation;
        if stale {
            debug!(key = %key, "Collection invalidated during fetch; storing result as stale");
        }
        state.entries.insert(
            key,
            CacheEntry {
                value: json,
                generation,
                stale,
            },
        );

        Ok(value)
    }

    /// Typed read of a fresh entry. Stale and missing entries are a miss.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<T, CacheError> {
        let state = self.read();
        match state.entries.get(key) {
            Some(entry) if !entry.stale => Ok(serde_json::from_value(entry.value.clone())?),
            _ => Err(CacheError::Miss),
        }
    }

    /// Last stored value regardless of staleness, for showing something while
    /// a refetch is in flight.
    pub fn last_known<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<T, CacheError> {
        let state = self.read();
        match state.entries.get(key) {
            Some(entry) => Ok(serde_json::from_value(entry.value.clone())?),
            None => Err(CacheError::Miss),
        }
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.read()
            .entries
            .get(key)
            .map(|entry| !entry.stale)
            .unwrap_or(false)
    }

    /// Seeds or overwrites an entry with a known value, e.g. the body of a
    /// successful create.
    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_value(value)?;
        let mut state = self.write();
        let generation = state.generation(key.collection);
        state.entries.insert(
            key,
            CacheEntry {
                value: json,
                generation,
                stale: false,
            },
        );
        Ok(())
    }

    /// Marks every entry of `collection` stale and bumps its generation in a
    /// single critical section.
    pub fn invalidate(&self, collection: Collection) {
        let marked = {
            let mut state = self.write();
            *state.generations.entry(collection).or_insert(0) += 1;
            let mut marked = 0usize;
            for (key, entry) in state.entries.iter_mut() {
                if key.collection == collection && !entry.stale {
                    entry.stale = true;
                    marked += 1;
                }
            }
            marked
        };
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("spool_cache.invalidations", 1, "collection" => collection.as_str());
        debug!(collection = %collection, marked, "Invalidated collection");
    }

    /// Marks a single entry stale. The collection generation is bumped as
    /// well, so a fetch of this key that is already in flight lands stale.
    pub fn invalidate_key(&self, key: &QueryKey) {
        {
            let mut state = self.write();
            *state.generations.entry(key.collection).or_insert(0) += 1;
            if let Some(entry) = state.entries.get_mut(key) {
                entry.stale = true;
            }
        }
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Invalidated key");
    }

    pub fn apply(&self, plan: &InvalidationPlan) {
        plan.apply(self);
    }

    /// Drops all entries of a collection. Generations are kept so in-flight
    /// fetches still land as stale.
    pub fn remove(&self, collection: Collection) {
        let mut state = self.write();
        *state.generations.entry(collection).or_insert(0) += 1;
        state.entries.retain(|key, _| key.collection != collection);
    }

    pub fn clear(&self) {
        let mut state = self.write();
        for generation in state.generations.values_mut() {
            *generation += 1;
        }
        state.entries.clear();
    }

    pub fn generation(&self, collection: Collection) -> u64 {
        self.read().generation(collection)
    }

    /// Generation the stored value was fetched under.
    pub fn entry_generation(&self, key: &QueryKey) -> Option<u64> {
        self.read().entries.get(key).map(|entry| entry.generation)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.read();
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            entries: state.entries.len(),
            stale_entries: state.entries.values().filter(|e| e.stale).count(),
        }
    }

    fn record_hit(&self, key: &QueryKey) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("spool_cache.hits", 1, "collection" => key.collection.as_str());
        debug!(key = %key, "Cache hit");
    }

    fn record_miss(&self, key: &QueryKey) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("spool_cache.misses", 1, "collection" => key.collection.as_str());
        debug!(key = %key, "Cache miss");
    }
}
