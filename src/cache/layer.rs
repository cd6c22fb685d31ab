//! Cache Layer Module
//!
//! Identity-keyed account cache with absolute and sliding expiry.

use std::sync::Arc;

use chrono::TimeDelta;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::cache::stats::StatsCounters;
use crate::cache::{CacheEntry, CacheStats};
use crate::clock::Clock;
use crate::config::Config;
use crate::models::{AccountId, AccountRecord};

// == Cache Policy ==
/// Expiry durations applied to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Lifetime from insertion
    pub absolute_expiry: TimeDelta,
    /// Lifetime from last access
    pub sliding_expiry: TimeDelta,
}

impl CachePolicy {
    pub fn new(absolute_expiry: TimeDelta, sliding_expiry: TimeDelta) -> Self {
        Self {
            absolute_expiry,
            sliding_expiry,
        }
    }

    /// Builds the policy from configured seconds.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            seconds(config.absolute_expiry),
            seconds(config.sliding_expiry),
        )
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(TimeDelta::hours(1), TimeDelta::minutes(10))
    }
}

/// Converts configured seconds, saturating to `TimeDelta::MAX`.
fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

// == Cache Layer ==
/// Advisory cache in front of the record store.
///
/// Expiry is checked lazily on access; `cleanup_expired` is an optional
/// sweep. Each key lives in one shard of the map, so operations on the same
/// key are serialized while different keys rarely contend.
pub struct CacheLayer {
    entries: DashMap<AccountId, CacheEntry>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    stats: StatsCounters,
}

impl CacheLayer {
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `policy` - Expiry durations for every entry
    /// * `clock` - Time source for deadlines
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
            stats: StatsCounters::default(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    // == Get ==
    /// Returns the cached record for `id` if present and not expired.
    ///
    /// A hit moves the sliding deadline forward. An expired entry is
    /// removed and reported as a miss.
    pub fn get(&self, id: AccountId) -> Option<AccountRecord> {
        let now = self.clock.now();

        match self.entries.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.remove();
                    self.stats.record_expirations(1);
                    self.stats.record_miss();
                    debug!(%id, "cache entry expired");
                    return None;
                }

                let entry = occupied.get_mut();
                entry.touch(now, self.policy.sliding_expiry);
                self.stats.record_hit();
                Some(entry.record.clone())
            }
            Entry::Vacant(_) => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Put ==
    /// Stores `record` under `id`, replacing any existing entry and
    /// resetting both deadlines.
    pub fn put(&self, id: AccountId, record: AccountRecord) {
        let entry = CacheEntry::new(
            record,
            self.clock.now(),
            self.policy.absolute_expiry,
            self.policy.sliding_expiry,
        );
        self.entries.insert(id, entry);
    }

    // == Invalidate ==
    /// Removes the entry for `id`; does nothing if absent.
    pub fn invalidate(&self, id: AccountId) {
        if self.entries.remove(&id).is_some() {
            self.stats.record_invalidation();
            debug!(%id, "cache entry invalidated");
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let expired = entry.is_expired(now);
            if expired {
                removed += 1;
            }
            !expired
        });

        self.stats.record_expirations(removed as u64);
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    /// Returns the number of entries, expired ones included until touched
    /// or swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("entries", &self.entries.len())
            .field("policy", &self.policy)
            .finish()
    }
}
