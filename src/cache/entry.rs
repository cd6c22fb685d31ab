//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with absolute and
//! sliding expiry.

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::AccountRecord;

// == Cache Entry ==
/// A cached account record with its expiry bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached record
    pub record: AccountRecord,
    /// Insertion time
    pub cached_at: DateTime<Utc>,
    /// Fixed deadline set at insertion, None = never
    pub absolute_expires_at: Option<DateTime<Utc>>,
    /// Inactivity deadline, moved forward on every hit, None = never
    pub sliding_expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry inserted at `now`.
    ///
    /// # Arguments
    /// * `record` - The record to cache
    /// * `now` - Insertion time
    /// * `absolute` - Lifetime from insertion
    /// * `sliding` - Lifetime from last access
    ///
    /// A deadline that would overflow the calendar is treated as never.
    pub fn new(
        record: AccountRecord,
        now: DateTime<Utc>,
        absolute: TimeDelta,
        sliding: TimeDelta,
    ) -> Self {
        Self {
            record,
            cached_at: now,
            absolute_expires_at: now.checked_add_signed(absolute),
            sliding_expires_at: now.checked_add_signed(sliding),
        }
    }

    // == Is Expired ==
    /// Checks if either deadline has been reached.
    ///
    /// Boundary condition: an entry is expired when `now` is greater than or
    /// equal to a deadline, so it is gone as soon as the duration has fully
    /// elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let reached = |deadline: Option<DateTime<Utc>>| deadline.is_some_and(|at| now >= at);
        reached(self.absolute_expires_at) || reached(self.sliding_expires_at)
    }

    // == Touch ==
    /// Moves the sliding deadline to `now + sliding`.
    pub fn touch(&mut self, now: DateTime<Utc>, sliding: TimeDelta) {
        self.sliding_expires_at = now.checked_add_signed(sliding);
    }

    // == Time To Live ==
    /// Returns the time until the nearest deadline, zero once expired.
    ///
    /// Returns None if neither deadline is set.
    pub fn ttl_remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        let nearest = match (self.absolute_expires_at, self.sliding_expires_at) {
            (Some(a), Some(s)) => Some(a.min(s)),
            (a, s) => a.or(s),
        };
        nearest.map(|at| (at - now).max(TimeDelta::zero()))
    }
}
