//! Cache module for dashboard data fetched from the console backend
//!
//! This module provides an in-process cache with per-key TTL policies. It
//! supports graceful degradation by serving the previous value for a key when a
//! refresh attempt fails, and exposes explicit invalidation for use after
//! user-initiated mutations.

mod actions;
mod clock;
mod keys;
mod service;

pub use actions::Action;
pub use clock::{Clock, ManualClock, SystemClock};
pub use keys::{CacheKey, TtlPolicy};
pub use service::{CacheService, CachedData, EntryState};

use thiserror::Error;

/// Errors returned by the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The producer failed and there was no previous value to fall back to
    #[error("Failed to fetch {key}: {source}")]
    Fetch {
        key: CacheKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A fetched value could not be converted for storage
    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: CacheKey,
        #[source]
        source: serde_json::Error,
    },

    /// A stored value doesn't match the type requested for its key
    #[error("Cached value for {key} has an unexpected shape: {source}")]
    Decode {
        key: CacheKey,
        #[source]
        source: serde_json::Error,
    },
}
