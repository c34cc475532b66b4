//! # compute-cache
//!
//! `compute-cache` is a keyed, in-process value cache with a coordination
//! layer for computed values, designed around one promise: when many callers
//! need the same missing key while a slow computation for it is running,
//! they wait for that computation instead of racing to produce duplicates.
//!
//! The crate is based on the [`moka`](https://crates.io/crates/moka) crate
//! for its default storage and is designed for use in asynchronous contexts.
//!
//! ## Vocabulary
//!
//! - **Backend**: The keyed, concurrent, expiration-aware store underneath
//!   the coordination layer. A backend implements the
//!   [`CacheBackend`](crate::traits::CacheBackend) trait.
//! - **Producer**: A user-supplied closure that computes the value for a
//!   key, handed to [`ComputingCache::compute_and_put`] and friends.
//! - **Computation**: A single-assignment cell registered for a key while
//!   its producer runs; the thing readers wait on.
//!
//! ## Basic Principles
//!
//! Keys and values are opaque to the cache; there is no schema per key.
//! Every entry carries its own [`CacheExpiration`](crate::expiration::CacheExpiration):
//! a life time bounding its age, an idle time bounding the gap between two
//! reads, or neither, in which case it only ever leaves the cache through
//! eviction or an explicit remove.
//!
//! The coordination layer owes its callers four guarantees, whatever the
//! interleaving:
//!
//! - Readers of a key being computed coalesce onto the oldest in-flight
//!   computation: one producer, N waiters.
//! - Competing producers may overlap; the faster one wins and the slower
//!   one's caller receives the faster result. The store only ever holds the
//!   winner's value.
//! - A remove or clear immediately releases all waiters with `None` and
//!   prevents every in-flight producer from storing, without interrupting
//!   the producers themselves.
//! - A reader never blocks on a recomputation when a previously stored
//!   value still exists; stale beats waiting.
//!
//! ## Architecture
//!
//! The central part of the crate is the
//! [`ComputingCache`](crate::cache::ComputingCache) object. It owns a
//! registry of per-key FIFO queues of pending computations and delegates all
//! storage to the backend submitted to its builder.
//!
//! Two backends ship with the crate: [`MemoryBackend`](crate::memory::MemoryBackend),
//! fronting a `moka` instance with a per-entry expiration policy, and
//! [`NoopBackend`](crate::noop::NoopBackend), which retains nothing and
//! leaves only the coordination behavior. Anything else honoring the
//! [`CacheBackend`](crate::traits::CacheBackend) contract can be swapped in.
//!
//! ## Caveats
//!
//! Producers are never aborted. A computation cancelled by a remove still
//! runs its producer to completion and simply discards the value. The cost
//! of an unused computation is preferable to tearing down arbitrary user
//! code holding arbitrary resources at an arbitrary point.

pub mod cache;
pub(crate) mod computation;
pub(crate) mod entry;
pub mod error;
pub mod expiration;
pub mod memory;
pub mod noop;
pub(crate) mod registry;
pub mod traits;

pub use cache::ComputingCache;

pub mod prelude {
    pub use crate::cache::CacheResult;
    pub use crate::cache::ComputingCache;
    pub use crate::error::CacheError;
    pub use crate::error::SharedError;
    pub use crate::expiration::CacheExpiration;
    pub use crate::memory::MemoryBackend;
    pub use crate::noop::NoopBackend;
    pub use crate::traits::CacheBackend;
}
