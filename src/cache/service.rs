//! In-process cache with per-key TTLs and stale-if-error fallback
//!
//! Provides a `CacheService` that remembers the last successfully fetched value
//! for each cache key, serves it while it is fresh, and falls back to it when a
//! refresh attempt fails.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::actions::Action;
use super::clock::{Clock, SystemClock};
use super::keys::{CacheKey, TtlPolicy};
use super::CacheError;

/// A stored value together with the time it was written
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    written_at: DateTime<Utc>,
}

/// Lifecycle state of a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Never written, or invalidated
    Empty,
    /// Written within its TTL
    Fresh,
    /// Written, but past its TTL or untracked
    Stale,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Empty => "empty",
            EntryState::Fresh => "fresh",
            EntryState::Stale => "stale",
        }
    }
}

/// Result of peeking into the cache, including freshness metadata
#[derive(Debug)]
pub struct CachedData<T> {
    /// The cached data
    pub data: T,
    /// When the data was written
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is past its TTL (always true for untracked keys)
    pub is_expired: bool,
}

struct Inner {
    policy: TtlPolicy,
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

/// Cheaply clonable handle to a shared cache
///
/// All clones observe the same entries. Construct one per session and pass it
/// to whatever needs it.
#[derive(Clone)]
pub struct CacheService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("policy", &self.inner.policy)
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

impl CacheService {
    /// Creates an empty cache that reads wall-clock time
    pub fn new(policy: TtlPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Creates an empty cache with a custom time source
    pub fn with_clock(policy: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                entries: DashMap::new(),
                clock,
            }),
        }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.inner.policy
    }

    /// Returns true if `key` has a TTL policy, has been written, and the
    /// write is younger than the TTL
    pub fn is_cache_valid(&self, key: CacheKey) -> bool {
        match self.inner.entries.get(&key) {
            Some(entry) => self.is_fresh(key, &entry),
            None => false,
        }
    }

    /// Reports whether `key` is empty, fresh or stale
    pub fn state(&self, key: CacheKey) -> EntryState {
        match self.inner.entries.get(&key) {
            Some(entry) if self.is_fresh(key, &entry) => EntryState::Fresh,
            Some(_) => EntryState::Stale,
            None => EntryState::Empty,
        }
    }

    fn is_fresh(&self, key: CacheKey, entry: &CacheEntry) -> bool {
        let Some(ttl) = self.inner.policy.duration_for(key) else {
            return false;
        };
        // A clock that moved backwards counts as zero elapsed time
        let elapsed = (self.inner.clock.now() - entry.written_at)
            .to_std()
            .unwrap_or_default();
        elapsed < ttl
    }

    /// Returns the cached value for `key` if fresh, otherwise awaits `fetch`
    ///
    /// A successful fetch replaces the entry and resets its timestamp. A failed
    /// fetch falls back to the previous entry when one exists; with no previous
    /// entry the producer's error is returned as `CacheError::Fetch`.
    ///
    /// Overlapping misses on the same key each run their own producer and the
    /// last one to finish wins.
    pub async fn get<T, E, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.fresh_value(key) {
            debug!(%key, "cache hit");
            return decode(key, value);
        }

        debug!(%key, "cache miss, fetching fresh data");
        match fetch().await {
            Ok(data) => {
                let value = serde_json::to_value(&data)
                    .map_err(|source| CacheError::Encode { key, source })?;
                self.raw_set(key, value);
                Ok(data)
            }
            Err(err) => match self.raw_get(key) {
                Some(stale) => {
                    warn!(%key, error = %err, "fetch failed, returning stale cache");
                    decode(key, stale)
                }
                None => Err(CacheError::Fetch {
                    key,
                    source: Box::new(err),
                }),
            },
        }
    }

    /// Reads the entry for `key` without fetching, fresh or not
    pub fn peek<T: DeserializeOwned>(
        &self,
        key: CacheKey,
    ) -> Result<Option<CachedData<T>>, CacheError> {
        let Some(entry) = self.inner.entries.get(&key).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        let is_expired = !self.is_fresh(key, &entry);
        Ok(Some(CachedData {
            data: decode(key, entry.value)?,
            cached_at: entry.written_at,
            is_expired,
        }))
    }

    /// Deletes the entry for `key`; the next `get` is guaranteed to fetch
    pub fn invalidate(&self, key: CacheKey) {
        self.inner.entries.remove(&key);
        info!(%key, "cache invalidated");
    }

    /// Drops every entry, including untracked ones
    pub fn clear_all(&self) {
        self.inner.entries.clear();
        info!("all cache cleared");
    }

    /// Drops every tracked entry belonging to the signed-in user
    pub fn clear_user_data(&self) {
        for key in CacheKey::TRACKED {
            self.invalidate(key);
        }
    }

    /// Invalidates the keys affected by the named action
    ///
    /// Unknown names are logged and otherwise ignored. Returns the parsed
    /// action, if any.
    pub fn refresh_after_action(&self, name: &str) -> Option<Action> {
        let Some(action) = Action::from_name(name) else {
            warn!(action = name, "unknown action, cache left untouched");
            return None;
        };
        self.apply_action(action);
        Some(action)
    }

    /// Invalidates the keys affected by `action`
    pub fn apply_action(&self, action: Action) {
        for key in action.affected_keys() {
            self.invalidate(*key);
        }
    }

    fn fresh_value(&self, key: CacheKey) -> Option<Value> {
        let entry = self.inner.entries.get(&key)?;
        self.is_fresh(key, &entry).then(|| entry.value.clone())
    }

    pub(crate) fn raw_get(&self, key: CacheKey) -> Option<Value> {
        self.inner.entries.get(&key).map(|entry| entry.value.clone())
    }

    pub(crate) fn raw_set(&self, key: CacheKey, value: Value) {
        let entry = CacheEntry {
            value,
            written_at: self.inner.clock.now(),
        };
        self.inner.entries.insert(key, entry);
    }
}

fn decode<T: DeserializeOwned>(key: CacheKey, value: Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|source| CacheError::Decode { key, source })
}
