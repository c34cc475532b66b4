use async_trait::async_trait;
use fieldx::fxstruct;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use std::convert::Infallible;
use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crate::entry::ExpirableEntry;
use crate::expiration::CacheExpiration;
use crate::traits::CacheBackend;

// Entries carry their own expiration, so the moka instance is told per entry
// when to drop it rather than being configured with cache-wide TTL/TTI.
struct EntryExpiry;

impl<K, V> Expiry<K, Arc<ExpirableEntry<V>>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &Arc<ExpirableEntry<V>>,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.time_to_expiry()
    }

    fn expire_after_read(
        &self,
        _key: &K,
        entry: &Arc<ExpirableEntry<V>>,
        _read_at: Instant,
        _duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        entry.time_to_expiry()
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &Arc<ExpirableEntry<V>>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.time_to_expiry()
    }
}

/// The default in-process backend, fronting a `moka` instance.
///
/// Values are wrapped into expirable entries so that life and idle bounds
/// hold per entry. The moka expiry policy drives eviction from the same
/// per-entry state, but reads check expiration themselves and invalidate
/// stale entries, so precision does not depend on moka's housekeeping
/// cadence. The backend itself never fails; its error type is
/// [`Infallible`].
#[fxstruct(sync, no_new, default(off), builder(doc(
    "Builder object of [`MemoryBackend`].",
    "",
    "See [`MemoryBackend::builder()`] method."
)))]
pub struct MemoryBackend<K, V>
where
    K: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static,
    V: Debug + Clone + Send + Sync + 'static,
{
    /// Upper bound on the number of entries the backend retains. Older
    /// entries are evicted beyond it, whatever their expiration says.
    #[fieldx(get(copy), default(10_000))]
    max_capacity: u64,

    /// Backend name. Most useful for debugging and logging.
    #[fieldx(optional, get(copy))]
    name: &'static str,

    #[fieldx(private, lazy, get(clone), builder(off))]
    cache: Cache<K, Arc<ExpirableEntry<V>>>,
}

impl<K, V> MemoryBackend<K, V>
where
    K: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static,
    V: Debug + Clone + Send + Sync + 'static,
{
    fn build_cache(&self) -> Cache<K, Arc<ExpirableEntry<V>>> {
        Cache::builder()
            .max_capacity(self.max_capacity())
            .name(self.name().unwrap_or_else(|| std::any::type_name::<V>()))
            .eviction_policy(EvictionPolicy::tiny_lfu())
            .expire_after(EntryExpiry)
            .build()
    }

    /// A backend with the default limits.
    pub fn new() -> Self {
        Self::builder().build().unwrap()
    }
}

impl<K, V> Default for MemoryBackend<K, V>
where
    K: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static,
    V: Debug + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> CacheBackend for MemoryBackend<K, V>
where
    K: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static,
    V: Debug + Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;
    type Error = Infallible;

    async fn put(&self, key: K, value: V, expiration: CacheExpiration) -> Result<(), Infallible> {
        let entry = Arc::new(ExpirableEntry::new(value, expiration));
        self.cache().insert(key, entry).await;
        Ok(())
    }

    async fn get(&self, key: &K) -> Result<Option<V>, Infallible> {
        Ok(match self.cache().get(key).await {
            Some(entry) if entry.is_expired() => {
                self.cache().invalidate(key).await;
                None
            }
            Some(entry) => {
                entry.touch();
                Some(entry.value().clone())
            }
            None => None,
        })
    }

    async fn remove(&self, key: &K) -> Result<Option<V>, Infallible> {
        Ok(self
            .cache()
            .remove(key)
            .await
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value().clone()))
    }

    async fn clear(&self) -> Result<(), Infallible> {
        self.cache().invalidate_all();
        Ok(())
    }

    async fn contains(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self
            .cache()
            .get(key)
            .await
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn keys(&self) -> Result<Vec<K>, Infallible> {
        Ok(self
            .cache()
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| (*key).clone())
            .collect())
    }
}
