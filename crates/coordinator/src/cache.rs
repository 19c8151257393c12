//! The Recommendation Cache (spec §4.H): a single-flight, fingerprinted
//! memoization layer over an external similarity-computation function.

use async_trait::async_trait;
use indexmap::IndexMap;
use loraflow_core::{Clock, RecommendationFingerprint};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

/// Computes the (possibly expensive) similarity result for a fingerprint.
/// The cache calls this at most once per fingerprint per build (spec
/// §4.H single-flight guarantee); everything upstream of it (embeddings,
/// analytics) is out of scope for the core.
#[async_trait]
pub trait RecommendationSource: Send + Sync + 'static {
    async fn compute(&self, fingerprint: &RecommendationFingerprint) -> Vec<u8>;
}

#[derive(Clone)]
struct Entry {
    value: Arc<Vec<u8>>,
    built_at: chrono::DateTime<chrono::Utc>,
    byte_size: u64,
}

enum Slot {
    Ready(Entry),
    /// A build is in flight; waiters subscribe to be woken with the result.
    /// Evicting a fingerprint in this state is prohibited (spec §4.H).
    Building(broadcast::Sender<Arc<Vec<u8>>>),
}

/// Tunables for one cache instance (spec §4.H, expanded spec §1.3).
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
    pub max_bytes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(600), max_entries: 1024, max_bytes: 64 * 1024 * 1024 }
    }
}

struct Inner<C> {
    slots: Mutex<IndexMap<RecommendationFingerprint, Slot>>,
    settings: CacheSettings,
    clock: C,
}

/// At-most-one-concurrent-build cache over `compute`, keyed by
/// [`RecommendationFingerprint`] (spec §4.H).
pub struct RecommendationCache<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for RecommendationCache<C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<C: Clock> RecommendationCache<C> {
    pub fn new(settings: CacheSettings, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner { slots: Mutex::new(IndexMap::new()), settings, clock }),
        }
    }

    /// Return the cached value for `fingerprint`, building it via `source`
    /// if absent or expired. Concurrent callers for the same fingerprint
    /// share exactly one `compute` call (spec §4.H, §8 single-flight law).
    pub async fn get_or_build(
        &self,
        fingerprint: RecommendationFingerprint,
        source: &(impl RecommendationSource + ?Sized),
    ) -> Arc<Vec<u8>> {
        loop {
            let mut waiter = None;
            {
                let mut slots = self.inner.slots.lock();
                match slots.get(&fingerprint) {
                    Some(Slot::Ready(entry)) if !self.is_expired(entry) => {
                        return entry.value.clone();
                    }
                    Some(Slot::Building(sender)) => {
                        waiter = Some(sender.subscribe());
                    }
                    _ => {
                        let (sender, _) = broadcast::channel(1);
                        slots.insert(fingerprint.clone(), Slot::Building(sender));
                    }
                }
            }

            if let Some(mut receiver) = waiter {
                match receiver.recv().await {
                    Ok(value) => return value,
                    // The builder dropped the sender without broadcasting
                    // (panicked mid-build); fall through and race to build
                    // it ourselves on the next loop iteration.
                    Err(_) => continue,
                }
            }

            return self.build(fingerprint, source).await;
        }
    }

    async fn build(
        &self,
        fingerprint: RecommendationFingerprint,
        source: &(impl RecommendationSource + ?Sized),
    ) -> Arc<Vec<u8>> {
        let raw = source.compute(&fingerprint).await;
        let value = Arc::new(raw);
        let entry = Entry { value: value.clone(), built_at: self.inner.clock.now(), byte_size: value.len() as u64 };

        let sender = {
            let mut slots = self.inner.slots.lock();
            let previous = slots.insert(fingerprint.clone(), Slot::Ready(entry));
            self.evict_if_needed(&mut slots);
            match previous {
                Some(Slot::Building(sender)) => Some(sender),
                _ => None,
            }
        };
        if let Some(sender) = sender {
            let _ = sender.send(value.clone());
        }
        value
    }

    /// Remove every entry matching `predicate` (spec §4.H, used when an
    /// adapter changes upstream). Never touches an in-flight build.
    pub fn invalidate(&self, predicate: impl Fn(&RecommendationFingerprint) -> bool) {
        let mut slots = self.inner.slots.lock();
        slots.retain(|fingerprint, slot| match slot {
            Slot::Building(_) => true,
            Slot::Ready(_) => !predicate(fingerprint),
        });
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        let ttl = chrono::Duration::from_std(self.inner.settings.ttl).unwrap_or_default();
        self.inner.clock.now() - entry.built_at > ttl
    }

    /// LRU-by-insertion-order plus a soft byte budget. An entry with an
    /// in-flight build is never a candidate, so the inflight-signal
    /// invariant holds even under eviction pressure (spec §4.H).
    fn evict_if_needed(&self, slots: &mut IndexMap<RecommendationFingerprint, Slot>) {
        let total_bytes: u64 = slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(entry) => Some(entry.byte_size),
                Slot::Building(_) => None,
            })
            .sum();
        let over_count = slots.len() > self.inner.settings.max_entries;
        let over_bytes = total_bytes > self.inner.settings.max_bytes;
        if !over_count && !over_bytes {
            return;
        }

        let evictable: Vec<RecommendationFingerprint> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();

        let mut freed_bytes = 0u64;
        let mut freed_count = 0usize;
        for fingerprint in evictable {
            let now_count = slots.len() - freed_count;
            let now_bytes = total_bytes - freed_bytes;
            if now_count <= self.inner.settings.max_entries && now_bytes <= self.inner.settings.max_bytes {
                break;
            }
            if let Some(Slot::Ready(entry)) = slots.shift_remove(&fingerprint) {
                freed_bytes += entry.byte_size;
                freed_count += 1;
                debug!(%fingerprint, "evicted recommendation cache entry");
            }
        }
    }
}

/// Shorthand used by callers that don't need per-request sources, e.g. the
/// server composition root wiring one fixed similarity backend.
pub type SharedSource = Arc<dyn RecommendationSource>;

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
