use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TTL-wrapped value as persisted in the blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self::fetched_at(value, Utc::now(), ttl)
    }

    pub fn fetched_at(value: T, fetched_at: DateTime<Utc>, ttl: Duration) -> Self {
        CacheEntry {
            value,
            fetched_at,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// An entry is valid while `now - fetched_at <= ttl`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age_ms = (now - self.fetched_at).num_milliseconds();
        age_ms > 0 && age_ms as u64 > self.ttl_ms
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Forces the entry past its TTL while keeping the value in place.
    pub fn expire(&mut self) {
        let cutoff = Utc::now() - chrono::Duration::milliseconds(1);
        self.ttl_ms = 0;
        if self.fetched_at > cutoff {
            self.fetched_at = cutoff;
        }
    }
}
