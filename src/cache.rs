use crate::computation::Outcome;
use crate::error::CacheError;
use crate::error::SharedError;
use crate::expiration::CacheExpiration;
use crate::registry::ComputationRegistry;
use crate::registry::Enlistment;
use crate::traits::CacheBackend;

use fieldx_plus::fx_plus;
use std::error::Error;
use std::future::ready;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use tracing::instrument;
use tracing::trace;
use tracing::warn;

/// Result type of [`ComputingCache`] operations. `B` is the backend, `E` the
/// error type of user producers.
pub type CacheResult<T, B, E> = Result<T, CacheError<<B as CacheBackend>::Error, E>>;

type ArcRegistry<B, E> =
    Arc<ComputationRegistry<<B as CacheBackend>::Key, <B as CacheBackend>::Value, E>>;

/// This is where all the magic happens!
///
/// The computing cache layers request coalescing over any
/// [`CacheBackend`]: while a producer is computing a value for a key, every
/// reader of that key blocks on the in-flight computation instead of
/// kicking off a duplicate one.
///
/// ```ignore
/// let cache = ComputingCache::builder()
///     .backend(MemoryBackend::new())
///     .build()?;
///
/// let value = cache
///     .compute_and_put("report", || async { expensive_report().await })
///     .await?;
/// ```
///
/// The rules the coordination follows, whatever the interleaving:
///
/// - Competing producers for one key may overlap freely; whichever finishes
///   first publishes its value to every *older*, still-running sibling, so
///   a slower producer's caller receives the faster producer's result.
/// - A reader always prefers an already-stored value, even a stale one,
///   over waiting on a recomputation.
/// - A remove or clear makes every current waiter observe `None` at once.
///   In-flight producers are never interrupted; they run to completion,
///   skip the store write, and still hand their own value back to their own
///   caller.
/// - A producer failure reaches the producer's caller and every waiter,
///   with the original cause shared between them.
#[fx_plus(
    parent,
    new(off),
    default(off),
    sync,
    builder(
        doc("Builder object of [`ComputingCache`].", "", "See [`ComputingCache::builder()`] method."),
        method_doc("Implement builder pattern for [`ComputingCache`]."),
    )
)]
pub struct ComputingCache<B, E>
where
    B: CacheBackend,
    E: Error + Send + Sync + 'static,
{
    #[fieldx(vis(pub(crate)), builder(vis(pub), required, into), get(clone))]
    backend: Arc<B>,

    /// Cache name. Most useful for debugging and logging.
    #[fieldx(optional, get(copy))]
    name: &'static str,

    #[fieldx(private, lazy, get(clone), builder(off))]
    computations: ArcRegistry<B, E>,
}

impl<B, E> ComputingCache<B, E>
where
    B: CacheBackend,
    E: Error + Send + Sync + 'static,
{
    fn build_computations(&self) -> ArcRegistry<B, E> {
        Arc::new(ComputationRegistry::new())
    }

    /// Stores `value` under `key` eternally.
    ///
    /// See [`put_expiring`](Self::put_expiring).
    pub async fn put(&self, key: B::Key, value: B::Value) -> CacheResult<B::Value, B, E> {
        self.put_expiring(key, value, CacheExpiration::ETERNAL).await
    }

    /// Stores `value` under `key` with the given expiration.
    ///
    /// A direct put is a computation that is merely trivially fast, so it
    /// takes part in the ordering between competing producers: performed
    /// while a producer is running for the same key, it wins over any
    /// still-unfinished older one. Returns the value that ended up
    /// published, which is `value` unless an even faster competitor got
    /// ahead.
    pub async fn put_expiring(
        &self,
        key: B::Key,
        value: B::Value,
        expiration: CacheExpiration,
    ) -> CacheResult<B::Value, B, E> {
        self.compute_and_put_expiring(key, || ready(Ok(value)), expiration)
            .await
    }

    /// Computes a value for `key` and stores it eternally.
    ///
    /// See [`compute_and_put_expiring`](Self::compute_and_put_expiring).
    pub async fn compute_and_put<F, Fut>(&self, key: B::Key, producer: F) -> CacheResult<B::Value, B, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B::Value, E>>,
    {
        self.compute_and_put_expiring(key, producer, CacheExpiration::ETERNAL)
            .await
    }

    /// Computes a value for `key` on the calling task and stores it with the
    /// given expiration.
    ///
    /// The computation is registered *before* the producer runs; from that
    /// moment on, readers of `key` wait on it rather than starting a
    /// duplicate. The producer is invoked exactly once and never
    /// interrupted, not even when the computation is cancelled by a
    /// concurrent [`remove`](Self::remove) or [`clear`](Self::clear). In
    /// that case the computed value is not stored and is returned to this
    /// caller alone. If a competing producer finishes first, its value is
    /// returned instead of the locally computed one and nothing is stored.
    ///
    /// A failing producer settles the computation with its error: this
    /// caller receives [`CacheError::Computation`], as does every reader
    /// currently waiting, all sharing the original cause. Nothing is stored.
    #[instrument(level = "trace", skip(self, producer))]
    pub async fn compute_and_put_expiring<F, Fut>(
        &self,
        key: B::Key,
        producer: F,
        expiration: CacheExpiration,
    ) -> CacheResult<B::Value, B, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B::Value, E>>,
    {
        let registry = self.computations();
        // Registering before the producer runs is what lets concurrent
        // readers wait on this computation instead of kicking off their own.
        let enlistment = Enlistment::new(Arc::clone(&registry), key.clone());
        let computation = Arc::clone(enlistment.computation());

        trace!("computing value for key '{key}'");
        let value = match producer().await {
            Ok(value) => value,
            Err(error) => {
                warn!("computation for key '{key}' failed");
                let shared = SharedError::new(error);
                computation.try_settle(Outcome::Failed(shared.clone()));
                return Err(CacheError::Computation(shared));
            }
        };

        if computation.try_settle(Outcome::Computed(value.clone())) {
            // Everything queued before this computation is older; whatever
            // of it is still pending adopts the value just computed.
            registry.settle_older(&key, &computation, &value);
            trace!("storing computed value under key '{key}'");
            self.backend()
                .put(key, value.clone(), expiration)
                .await
                .map_err(CacheError::Backend)?;
            Ok(value)
        }
        else {
            match computation.outcome() {
                Some(Outcome::Computed(newer)) => {
                    trace!("another computation was faster for key '{key}'");
                    Ok(newer)
                }
                Some(Outcome::Failed(error)) => Err(CacheError::Computation(error)),
                Some(Outcome::Cancelled) | None => {
                    debug!("key '{key}' was removed during the computation, returning the local value");
                    Ok(value)
                }
            }
        }
    }

    /// Returns the existing value for `key`, computing and storing one
    /// eternally only if there is none.
    ///
    /// See [`compute_and_put_if_absent_expiring`](Self::compute_and_put_if_absent_expiring).
    pub async fn compute_and_put_if_absent<F, Fut>(
        &self,
        key: B::Key,
        producer: F,
    ) -> CacheResult<B::Value, B, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B::Value, E>>,
    {
        self.compute_and_put_if_absent_expiring(key, producer, CacheExpiration::ETERNAL)
            .await
    }

    /// Returns the existing value for `key`, computing and storing one only
    /// if there is none.
    ///
    /// "Existing" goes through [`get`](Self::get), so this legitimately
    /// waits on an in-flight computation for the key instead of piling a
    /// second one on top of it.
    pub async fn compute_and_put_if_absent_expiring<F, Fut>(
        &self,
        key: B::Key,
        producer: F,
        expiration: CacheExpiration,
    ) -> CacheResult<B::Value, B, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B::Value, E>>,
    {
        match self.get(&key).await? {
            Some(value) => {
                trace!("read pre-computed value for key '{key}'");
                Ok(value)
            }
            None => self.compute_and_put_expiring(key, producer, expiration).await,
        }
    }

    /// Reads the value under `key`.
    ///
    /// The backend is consulted first: a reader prefers an already-stored
    /// value, even one about to be replaced, over blocking on an in-flight
    /// recomputation. Only when the backend has nothing does the reader wait
    /// on the oldest pending computation for the key, receiving its value,
    /// `None` if it was cancelled, or its error.
    #[instrument(level = "trace", skip(self))]
    pub async fn get(&self, key: &B::Key) -> CacheResult<Option<B::Value>, B, E> {
        if let Some(value) = self.backend().get(key).await.map_err(CacheError::Backend)? {
            trace!("reading pre-computed value for key '{key}' from the backend");
            return Ok(Some(value));
        }

        let Some(computation) = self.computations().peek(key)
        else {
            trace!("no computation for key '{key}', returning nothing");
            return Ok(None);
        };

        trace!("waiting for the oldest computation of key '{key}'");
        match computation.wait().await {
            Outcome::Computed(value) => Ok(Some(value)),
            Outcome::Cancelled => {
                debug!("computation for key '{key}' was cancelled during the read");
                Ok(None)
            }
            Outcome::Failed(error) => {
                warn!("computation for key '{key}' failed while a reader was waiting");
                Err(CacheError::Computation(error))
            }
        }
    }

    /// Removes the entry under `key`, returning the prior stored value.
    ///
    /// Every reader currently waiting for `key` observes `None` at once.
    /// Every in-flight producer for `key` finds its computation cancelled
    /// when it finishes: it skips the store write and returns its locally
    /// computed value to its own caller only.
    #[instrument(level = "trace", skip(self))]
    pub async fn remove(&self, key: &B::Key) -> CacheResult<Option<B::Value>, B, E> {
        let drained = self.computations().cancel_all(key);
        if drained > 0 {
            debug!("forced {drained} running computation(s) for key '{key}' to observe a cancellation");
        }
        self.backend().remove(key).await.map_err(CacheError::Backend)
    }

    /// Compare-and-remove: removes `key` only when the stored value equals
    /// `expected`. Returns whether it did. Absent and mismatching entries
    /// both answer `false`.
    pub async fn remove_expected(&self, key: &B::Key, expected: &B::Value) -> CacheResult<bool, B, E>
    where
        B::Value: PartialEq,
    {
        match self.backend().get(key).await.map_err(CacheError::Backend)? {
            Some(current) if current == *expected => {
                self.remove(key).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Stores `value` under `key` only when some value is already present;
    /// returns the prior value, `None` when the key was absent.
    pub async fn replace(&self, key: B::Key, value: B::Value) -> CacheResult<Option<B::Value>, B, E> {
        let previous = self.backend().get(&key).await.map_err(CacheError::Backend)?;
        if previous.is_some() {
            self.put(key, value).await?;
        }
        Ok(previous)
    }

    /// Stores `value` under `key` only when the current value equals
    /// `expected`. Returns whether it did.
    pub async fn replace_expected(
        &self,
        key: B::Key,
        expected: &B::Value,
        value: B::Value,
    ) -> CacheResult<bool, B, E>
    where
        B::Value: PartialEq,
    {
        match self.backend().get(&key).await.map_err(CacheError::Backend)? {
            Some(current) if current == *expected => {
                self.put(key, value).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Removes every key the predicate matches, with full
    /// [`remove`](Self::remove) semantics per key. Returns whether anything
    /// matched.
    pub async fn remove_if<P>(&self, predicate: P) -> CacheResult<bool, B, E>
    where
        P: Fn(&B::Key) -> bool,
    {
        let mut removed_any = false;
        for key in self.backend().keys().await.map_err(CacheError::Backend)? {
            if predicate(&key) {
                self.remove(&key).await?;
                removed_any = true;
            }
        }
        Ok(removed_any)
    }

    /// Empties the cache.
    ///
    /// Keys with running computations are removed first, forcing their
    /// waiters to `None` and their producers to skip the store write, and
    /// only then is the backend cleared, so a reader can never pick up a
    /// value from a producer unaware of the clear.
    #[instrument(level = "trace", skip(self))]
    pub async fn clear(&self) -> CacheResult<(), B, E> {
        for key in self.computations().keys() {
            self.remove(&key).await?;
        }
        self.backend().clear().await.map_err(CacheError::Backend)
    }
}
