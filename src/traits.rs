use async_trait::async_trait;
use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;

use crate::expiration::CacheExpiration;

/// The [backend](crate#backend) contract.
///
/// A backend is the keyed, concurrent, expiration-aware store the
/// [`ComputingCache`](crate::ComputingCache) coordinates over. The crate
/// ships two implementations, [`MemoryBackend`](crate::memory::MemoryBackend)
/// and [`NoopBackend`](crate::noop::NoopBackend), and anything honoring this
/// contract can be dropped in instead: an LRU engine, a sharded map, a client
/// for a remote caching service.
///
/// Implementations must apply the given expiration at insertion and answer
/// `None` for entries past their life bound. A successful read refreshes the
/// entry's idle window; the refresh must be atomic with respect to itself so
/// that concurrent readers both observe a renewed window. A backend may also
/// evict entries at any time for reasons of its own (memory pressure, size
/// caps); callers treat `None` strictly as "not present", never as an error.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// The key type. Keys are opaque to the cache; `Display` is only used
    /// for logging.
    type Key: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static;
    /// The value type stored under a key. Values are cloned out on reads and
    /// when a computation's result is shared between its waiters.
    type Value: Debug + Clone + Send + Sync + 'static;
    /// The error type of the backend. Propagated unchanged through the
    /// computing layer; the coordinator never retries.
    type Error: Error + Send + Sync + 'static;

    /// Inserts or replaces the value under `key`, applying `expiration` from
    /// this moment on.
    async fn put(
        &self,
        key: Self::Key,
        value: Self::Value,
        expiration: CacheExpiration,
    ) -> Result<(), Self::Error>;

    /// Returns the live value under `key`, refreshing its idle window.
    /// Expired and absent entries both come back as `None`.
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error>;

    /// Removes the entry under `key` and returns the prior live value, if
    /// there was one.
    async fn remove(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error>;

    /// Drops every entry.
    async fn clear(&self) -> Result<(), Self::Error>;

    /// Whether a live value exists under `key`. Must agree with [`get`] at a
    /// moment in time but does not refresh the idle window.
    ///
    /// [`get`]: CacheBackend::get
    async fn contains(&self, key: &Self::Key) -> Result<bool, Self::Error>;

    /// A snapshot of the keys with live values.
    async fn keys(&self) -> Result<Vec<Self::Key>, Self::Error>;
}
