use async_trait::async_trait;
use std::convert::Infallible;
use std::fmt::Debug;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::expiration::CacheExpiration;
use crate::traits::CacheBackend;

/// A backend that never retains anything.
///
/// Writes are discarded and reads always answer `None`. Layered under a
/// [`ComputingCache`](crate::ComputingCache) it still coalesces readers onto
/// in-flight computations; only the finished values are gone the moment
/// they would have been stored. Useful for switching caching off without
/// touching call sites, and for exercising the coordination layer alone.
#[derive(Debug)]
pub struct NoopBackend<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NoopBackend<K, V> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K, V> Default for NoopBackend<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for NoopBackend<K, V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> CacheBackend for NoopBackend<K, V>
where
    K: Debug + Display + Hash + Eq + Clone + Send + Sync + 'static,
    V: Debug + Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;
    type Error = Infallible;

    async fn put(&self, _key: K, _value: V, _expiration: CacheExpiration) -> Result<(), Infallible> {
        Ok(())
    }

    async fn get(&self, _key: &K) -> Result<Option<V>, Infallible> {
        Ok(None)
    }

    async fn remove(&self, _key: &K) -> Result<Option<V>, Infallible> {
        Ok(None)
    }

    async fn clear(&self) -> Result<(), Infallible> {
        Ok(())
    }

    async fn contains(&self, _key: &K) -> Result<bool, Infallible> {
        Ok(false)
    }

    async fn keys(&self) -> Result<Vec<K>, Infallible> {
        Ok(Vec::new())
    }
}
