//! TTL cache with single-flight request coalescing
//!
//! At most one computation runs per key. Callers arriving while it is in
//! flight await the same result instead of starting their own, so N
//! concurrent requests for the same scraped page cost one upstream fetch.
//! Expiry is checked lazily on access; nothing runs in the background.

use super::entry::{Computation, EntryState, ReadyEntry, Slot};
use super::stats::{CacheStats, Counters};
use crate::shared::config::CacheSettings;
use crate::shared::errors::{GatewayError, GatewayResult};
use crate::shared::utils::logger::LogContext;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct CacheInner<V> {
    entries: DashMap<String, Slot<V>>,
    counters: Counters,
    next_generation: AtomicU64,
    max_entries: usize,
    compute_deadline: Option<Duration>,
}

/// Process-wide cache handle; clones share the same entries
pub struct CoalescingCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for CoalescingCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Share of `max_entries` freed in one eviction pass
const EVICTION_BATCH_DIVISOR: usize = 10;

/// What a lookup found, taken out of the map before any await
enum Lookup<V> {
    Hit(V),
    Join(Computation<V>),
    Miss,
}

impl<V> CoalescingCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: usize, compute_deadline: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                counters: Counters::default(),
                next_generation: AtomicU64::new(0),
                max_entries: max_entries.max(1),
                compute_deadline,
            }),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.max_entries, settings.compute_deadline)
    }

    /// Return the cached value for `key`, or compute it exactly once
    ///
    /// `ttl_seconds <= 0` bypasses the cache entirely. A failed computation is
    /// handed to every waiter and never stored, so the next call starts fresh.
    /// `compute` is first invoked when the computation is polled, after the
    /// map lock is released, so it may use this cache itself.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: impl Into<String>,
        ttl_seconds: i64,
        compute: F,
    ) -> GatewayResult<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = GatewayResult<V>> + Send + 'static,
    {
        let key = key.into();

        if ttl_seconds <= 0 {
            LogContext::cache_lookup(&key, "bypass");
            return guarded(key, self.inner.compute_deadline, compute).await;
        }
        let ttl = Duration::from_secs(ttl_seconds as u64);

        let computation = {
            let now = Instant::now();
            match self.inner.entries.entry(key.clone()) {
                Entry::Occupied(mut occupied) => {
                    let lookup = match occupied.get_mut() {
                        Slot::Ready(entry) if !entry.is_expired(now) => {
                            entry.last_access = now;
                            Lookup::Hit(entry.value.clone())
                        }
                        Slot::Ready(_) => Lookup::Miss,
                        Slot::Pending { computation, .. } => Lookup::Join(computation.clone()),
                    };

                    match lookup {
                        Lookup::Hit(value) => {
                            Counters::bump(&self.inner.counters.hits);
                            LogContext::cache_lookup(&key, "hit");
                            return Ok(value);
                        }
                        Lookup::Join(computation) => {
                            Counters::bump(&self.inner.counters.coalesced);
                            LogContext::cache_lookup(&key, "joined in-flight computation");
                            computation
                        }
                        Lookup::Miss => {
                            Counters::bump(&self.inner.counters.misses);
                            Counters::bump(&self.inner.counters.expired_removals);
                            LogContext::cache_lookup(&key, "expired");
                            let (generation, computation) = self.start(&key, ttl, compute);
                            occupied.insert(Slot::Pending {
                                generation,
                                computation: computation.clone(),
                            });
                            computation
                        }
                    }
                }
                Entry::Vacant(vacant) => {
                    Counters::bump(&self.inner.counters.misses);
                    LogContext::cache_lookup(&key, "miss");
                    let (generation, computation) = self.start(&key, ttl, compute);
                    vacant.insert(Slot::Pending {
                        generation,
                        computation: computation.clone(),
                    });
                    computation
                }
            }
        };

        computation.await
    }

    /// Peek at a ready, unexpired value without computing anything
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let value = match self.inner.entries.get(key)?.value() {
            Slot::Ready(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            _ => None,
        };

        if value.is_none()
            && self
                .inner
                .entries
                .remove_if(key, |_, slot| slot.is_expired(now))
                .is_some()
        {
            Counters::bump(&self.inner.counters.expired_removals);
        }
        value
    }

    pub fn state(&self, key: &str) -> EntryState {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .map_or(EntryState::Empty, |slot| slot.state(now))
    }

    /// Drop a key. A computation in flight still answers its waiters but its
    /// result is not stored.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.entries.remove(key).is_some();
        if removed {
            debug!("Invalidated cache entry for key: {}", key);
        }
        removed
    }

    /// Clear all cached entries and statistics
    pub fn clear(&self) {
        self.inner.entries.clear();
        self.inner.counters.reset();
        info!("Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let pending_count = self
            .inner
            .entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Pending { .. }))
            .count();
        self.inner
            .counters
            .snapshot(self.inner.entries.len(), pending_count)
    }

    /// Wrap `compute` into a shareable computation that settles its own slot.
    /// Nothing runs until the first waiter polls it.
    fn start<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> (u64, Computation<V>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = GatewayResult<V>> + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cache: Weak<CacheInner<V>> = Arc::downgrade(&self.inner);
        let deadline = self.inner.compute_deadline;
        let key = key.to_string();

        let computation = async move {
            let result = guarded(key.clone(), deadline, compute).await;
            if let Some(cache) = cache.upgrade() {
                cache.settle(&key, generation, ttl, &result);
            }
            result
        }
        .boxed()
        .shared();

        (generation, computation)
    }
}

/// Run `compute` with the optional deadline, turning a panic into
/// `InternalError`
async fn guarded<V, F, Fut>(key: String, deadline: Option<Duration>, compute: F) -> GatewayResult<V>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = GatewayResult<V>>,
{
    // Calling `compute` inside the block puts its synchronous part under
    // `catch_unwind` too
    let work = AssertUnwindSafe(async move { compute().await }).catch_unwind();
    let outcome = match deadline {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(Err(GatewayError::ComputeTimeout(format!(
                "computation for '{}' exceeded {:?}",
                key, limit
            )))),
        },
        None => work.await,
    };

    outcome.unwrap_or_else(|_| {
        Err(GatewayError::InternalError(format!(
            "computation for '{}' panicked",
            key
        )))
    })
}

impl<V: Clone> CacheInner<V> {
    /// Pending -> Ready on success, Pending -> Empty on failure. Only touches
    /// the slot if it still belongs to this computation, and never leaves it
    /// Pending once the computation is over.
    fn settle(&self, key: &str, generation: u64, ttl: Duration, result: &GatewayResult<V>) {
        let stored = match result {
            Ok(value) => catch_unwind(AssertUnwindSafe(|| self.store(key, generation, ttl, value)))
                .unwrap_or_else(|_| {
                    warn!("Storing value for key {} panicked, not caching", key);
                    false
                }),
            Err(error) => {
                warn!("Computation for key {} failed, not caching: {}", key, error);
                false
            }
        };

        if stored {
            debug!("Cached value for key: {} with TTL: {:?}", key, ttl);
            self.enforce_capacity();
        } else {
            self.entries
                .remove_if(key, |_, slot| slot.is_generation(generation));
        }
    }

    fn store(&self, key: &str, generation: u64, ttl: Duration, value: &V) -> bool {
        match self.entries.get_mut(key) {
            Some(mut slot) if slot.is_generation(generation) => {
                *slot = Slot::Ready(ReadyEntry::new(value.clone(), Instant::now(), ttl));
                true
            }
            _ => {
                debug!("Discarded result for invalidated key: {}", key);
                false
            }
        }
    }

    /// Once the map grows past `max_entries`, drop expired entries, then the
    /// least recently used ready entries down to the low watermark, so a full
    /// cache pays for the scan once per batch instead of on every insert.
    /// Pending entries are never evicted.
    fn enforce_capacity(&self) {
        let current_size = self.entries.len();
        if current_size <= self.max_entries {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        let expired = current_size.saturating_sub(self.entries.len());
        Counters::add(&self.counters.expired_removals, expired as u64);

        let low_watermark = self.max_entries - self.max_entries / EVICTION_BATCH_DIVISOR;
        let overflow = self.entries.len().saturating_sub(low_watermark);
        if overflow == 0 {
            return;
        }

        let mut candidates: Vec<(String, Instant)> = self
            .entries
            .iter()
            .filter_map(|item| match item.value() {
                Slot::Ready(entry) => Some((item.key().clone(), entry.last_access)),
                Slot::Pending { .. } => None,
            })
            .collect();
        candidates.sort_by_key(|(_, last_access)| *last_access);

        let mut evicted = 0;
        for (key, _) in candidates.into_iter().take(overflow) {
            if self
                .entries
                .remove_if(&key, |_, slot| matches!(slot, Slot::Ready(_)))
                .is_some()
            {
                evicted += 1;
            }
        }

        Counters::add(&self.counters.evictions, evicted);
        debug!(
            "Evicted {} cache entries (was {}, now {})",
            evicted,
            current_size,
            self.entries.len()
        );
    }
}
