//! Access-TTL-bounded cache of recently relayed message ids
//!
//! Maps a case-folded sender name to the platform message ids the bot relayed
//! on their behalf, so a later ban/mute can bulk-delete them. Entries idle
//! beyond the TTL are treated as absent; the total key count is capped with
//! least-recently-used eviction beyond the cap.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::constants::{MAX_TRACKED_SENDERS, RECENT_ID_LIMIT_PER_USER, RECENT_ID_TTL_SECONDS};
use crate::core::bounded_deque::BoundedDeque;
use crate::core::message::user_key;

struct CacheEntry {
    ids: Arc<BoundedDeque<String>>,
    last_access: Instant,
}

pub struct RecentIdCache {
    ttl: Duration,
    per_user_limit: usize,
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl Default for RecentIdCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RecentIdCache {
    pub fn new() -> Self {
        Self::with_config(
            Duration::from_secs(RECENT_ID_TTL_SECONDS),
            MAX_TRACKED_SENDERS,
            RECENT_ID_LIMIT_PER_USER,
        )
    }

    /// Cache with explicit TTL, key cap, and per-user id limit.
    pub fn with_config(ttl: Duration, max_keys: usize, per_user_limit: usize) -> Self {
        let cap = NonZeroUsize::new(max_keys.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            per_user_limit: per_user_limit.max(1),
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    fn expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.last_access) >= self.ttl
    }

    /// Record a message id sent on behalf of `name`.
    ///
    /// Get-or-create is atomic; the newest id lands at the front of the
    /// per-user deque and the entry's TTL clock is refreshed.
    pub fn record_id(&self, name: &str, message_id: impl Into<String>) {
        let key = user_key(name);
        let now = Instant::now();
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let stale = matches!(cache.get(&key), Some(entry) if self.expired(entry, now));
        if stale {
            cache.pop(&key);
        }

        if let Some(entry) = cache.get_mut(&key) {
            entry.last_access = now;
            entry.ids.push_front(message_id.into());
        } else {
            let ids = Arc::new(BoundedDeque::new(self.per_user_limit));
            ids.push_front(message_id.into());
            cache.put(
                key,
                CacheEntry {
                    ids,
                    last_access: now,
                },
            );
        }
    }

    /// Atomically drain the ids recorded for `name`, newest-first.
    ///
    /// Returns an empty list when the user is untracked or the entry's TTL
    /// elapsed. A drain refreshes the TTL of a live entry. An id recorded by
    /// a racing send after the drain snapshot survives for the next drain;
    /// purge is best-effort by design.
    pub fn drain(&self, name: &str) -> Vec<String> {
        let key = user_key(name);
        let now = Instant::now();
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        match cache.get_mut(&key) {
            Some(entry) if self.expired(entry, now) => {
                cache.pop(&key);
                Vec::new()
            }
            Some(entry) => {
                entry.last_access = now;
                entry.ids.drain_all()
            }
            None => Vec::new(),
        }
    }

    /// Drop every entry whose TTL elapsed. Intended for a periodic sweep;
    /// lookups already treat expired entries as absent.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| self.expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        expired.len()
    }

    /// Number of distinct tracked senders.
    pub fn tracked_senders(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
