//! Cache keys and their time-to-live policies
//!
//! Every category of dashboard data the console caches has a fixed key. Each
//! recognised key carries a TTL; the overview-stats key deliberately has none
//! and is therefore never considered fresh.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Identifies one category of cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheKey {
    Profile,
    Organizations,
    DashboardTemplates,
    Devices,
    MqttClusters,
    MqttInfo,
    MqttStats,
    /// Ad hoc slot written directly by callers; exempt from TTL expiry
    OverviewStats,
}

impl CacheKey {
    /// Keys that carry a TTL policy, in display order
    pub const TRACKED: [CacheKey; 7] = [
        CacheKey::Profile,
        CacheKey::Organizations,
        CacheKey::DashboardTemplates,
        CacheKey::Devices,
        CacheKey::MqttClusters,
        CacheKey::MqttInfo,
        CacheKey::MqttStats,
    ];

    /// Returns the stable string name of this key
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Profile => "profile",
            CacheKey::Organizations => "organizations",
            CacheKey::DashboardTemplates => "dashboardTemplates",
            CacheKey::Devices => "devices",
            CacheKey::MqttClusters => "mqttClusters",
            CacheKey::MqttInfo => "mqttInfo",
            CacheKey::MqttStats => "mqttStats",
            CacheKey::OverviewStats => "overviewStats",
        }
    }

    /// Parses a key from its string name
    ///
    /// Returns `None` for names that don't identify a cache key.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "profile" => Some(CacheKey::Profile),
            "organizations" => Some(CacheKey::Organizations),
            "dashboardTemplates" => Some(CacheKey::DashboardTemplates),
            "devices" => Some(CacheKey::Devices),
            "mqttClusters" => Some(CacheKey::MqttClusters),
            "mqttInfo" => Some(CacheKey::MqttInfo),
            "mqttStats" => Some(CacheKey::MqttStats),
            "overviewStats" => Some(CacheKey::OverviewStats),
            _ => None,
        }
    }

    /// Default time-to-live for this key, or `None` if the key is untracked
    pub fn default_ttl(&self) -> Option<Duration> {
        let secs = match self {
            CacheKey::Profile => 5 * 60,
            CacheKey::Organizations => 10 * 60,
            CacheKey::DashboardTemplates => 3 * 60,
            CacheKey::Devices => 2 * 60,
            CacheKey::MqttClusters => 2 * 60,
            CacheKey::MqttInfo => 60,
            CacheKey::MqttStats => 30,
            CacheKey::OverviewStats => return None,
        };
        Some(Duration::from_secs(secs))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable mapping from cache key to the time a value may be served
/// without revalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    durations: HashMap<CacheKey, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        let durations = CacheKey::TRACKED
            .into_iter()
            .filter_map(|key| key.default_ttl().map(|ttl| (key, ttl)))
            .collect();
        Self { durations }
    }
}

impl TtlPolicy {
    /// Builds the default table with the given per-key overrides applied
    ///
    /// Overrides for untracked keys are ignored so the overview-stats slot
    /// never gains an expiry.
    pub fn with_overrides(overrides: &HashMap<CacheKey, Duration>) -> Self {
        let mut policy = Self::default();
        for (key, ttl) in overrides {
            if policy.durations.contains_key(key) {
                policy.durations.insert(*key, *ttl);
            }
        }
        policy
    }

    /// Looks up how long a value for `key` stays fresh
    pub fn duration_for(&self, key: CacheKey) -> Option<Duration> {
        self.durations.get(&key).copied()
    }

    /// Iterates tracked keys with their durations in display order
    pub fn entries(&self) -> impl Iterator<Item = (CacheKey, Duration)> + '_ {
        CacheKey::TRACKED
            .into_iter()
            .filter_map(move |key| self.duration_for(key).map(|ttl| (key, ttl)))
    }
}
