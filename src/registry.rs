use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use crate::computation::Computation;
use crate::computation::Outcome;

/// Per-key FIFO queues of in-flight computations.
///
/// The map is sharded, so a reader peeking one key and a producer registering
/// under another never contend; even for the same key the critical sections
/// are a push, a front read, or a drain. A queue only exists while at least
/// one computation is in flight for its key: [`unregister`] drops the map
/// entry the moment the queue empties, so long-lived distinct keys cannot
/// grow the registry without bound.
///
/// [`unregister`]: ComputationRegistry::unregister
pub(crate) struct ComputationRegistry<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    queues: DashMap<K, VecDeque<Arc<Computation<V, E>>>>,
}

impl<K, V, E> ComputationRegistry<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self { queues: DashMap::new() }
    }

    /// Creates a fresh pending computation and appends it to the key's
    /// queue, creating the queue if needed. One atomic step under the shard
    /// lock, so a concurrent cleanup can never orphan the new cell.
    pub(crate) fn register(&self, key: &K) -> Arc<Computation<V, E>> {
        let computation = Arc::new(Computation::new());
        self.queues
            .entry(key.clone())
            .or_default()
            .push_back(Arc::clone(&computation));
        computation
    }

    /// The oldest in-flight computation for the key, if any. This is the one
    /// a reader waits on.
    pub(crate) fn peek(&self, key: &K) -> Option<Arc<Computation<V, E>>> {
        self.queues.get(key).and_then(|queue| queue.front().cloned())
    }

    /// Publishes a winner's value into every older, still-pending sibling.
    /// Everything queued after the winner is newer and is left alone.
    pub(crate) fn settle_older(&self, key: &K, winner: &Arc<Computation<V, E>>, value: &V) {
        if let Some(queue) = self.queues.get(key) {
            for other in queue.iter() {
                if Arc::ptr_eq(other, winner) {
                    break;
                }
                other.try_settle(Outcome::Computed(value.clone()));
            }
        }
    }

    /// Detaches the key's whole queue in one shot and cancels every member
    /// that is still pending, oldest first. Returns how many computations
    /// were drained.
    pub(crate) fn cancel_all(&self, key: &K) -> usize {
        let Some((_, drained)) = self.queues.remove(key)
        else {
            return 0;
        };
        let count = drained.len();
        for computation in drained {
            computation.try_settle(Outcome::Cancelled);
        }
        count
    }

    /// Removes the given computation from the key's queue, swallowing
    /// absence. An emptied queue leaves the map entirely.
    pub(crate) fn unregister(&self, key: &K, computation: &Arc<Computation<V, E>>) {
        if let Entry::Occupied(mut occupied) = self.queues.entry(key.clone()) {
            occupied
                .get_mut()
                .retain(|other| !Arc::ptr_eq(other, computation));
            if occupied.get().is_empty() {
                occupied.remove();
            }
        }
    }

    /// A snapshot of the keys with at least one in-flight computation.
    pub(crate) fn keys(&self) -> Vec<K> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// A computation's registration, undone on drop.
///
/// Removal lives in `Drop` so that a producer future dropped mid-computation
/// still leaves the queue clean; any reader left waiting on the abandoned
/// cell observes a cancellation. On the ordinary paths the cell is already
/// settled by the time the guard drops and the cancellation attempt is a
/// no-op.
pub(crate) struct Enlistment<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    registry:    Arc<ComputationRegistry<K, V, E>>,
    key:         K,
    computation: Arc<Computation<V, E>>,
}

impl<K, V, E> Enlistment<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub(crate) fn new(registry: Arc<ComputationRegistry<K, V, E>>, key: K) -> Self {
        let computation = registry.register(&key);
        Self {
            registry,
            key,
            computation,
        }
    }

    #[inline]
    pub(crate) fn computation(&self) -> &Arc<Computation<V, E>> {
        &self.computation
    }
}

impl<K, V, E> Drop for Enlistment<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.computation.try_settle(Outcome::Cancelled);
        self.registry.unregister(&self.key, &self.computation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    type TestRegistry = ComputationRegistry<&'static str, String, io::Error>;

    #[test]
    fn registration_is_fifo_and_peek_sees_the_oldest() {
        let registry = TestRegistry::new();
        let first = registry.register(&"k");
        let second = registry.register(&"k");

        let peeked = registry.peek(&"k").unwrap();
        assert!(Arc::ptr_eq(&peeked, &first));
        assert!(!Arc::ptr_eq(&peeked, &second));
        assert!(registry.peek(&"other").is_none());
    }

    #[test]
    fn emptied_queues_leave_the_map() {
        let registry = TestRegistry::new();
        let first = registry.register(&"k");
        let second = registry.register(&"k");
        assert_eq!(registry.keys(), vec!["k"]);

        registry.unregister(&"k", &first);
        assert!(registry.peek(&"k").is_some());
        registry.unregister(&"k", &second);
        assert!(registry.keys().is_empty());
        assert!(registry.queues.is_empty());

        // Absence is swallowed.
        registry.unregister(&"k", &second);
    }

    #[test]
    fn settle_older_stops_at_the_winner() {
        let registry = TestRegistry::new();
        let oldest = registry.register(&"k");
        let winner = registry.register(&"k");
        let newest = registry.register(&"k");

        registry.settle_older(&"k", &winner, &"new".to_owned());

        assert!(matches!(oldest.outcome(), Some(Outcome::Computed(v)) if v == "new"));
        assert!(!winner.is_settled());
        assert!(!newest.is_settled());
    }

    #[test]
    fn settle_older_skips_finished_siblings() {
        let registry = TestRegistry::new();
        let oldest = registry.register(&"k");
        oldest.try_settle(Outcome::Computed("done".to_owned()));
        let winner = registry.register(&"k");

        registry.settle_older(&"k", &winner, &"new".to_owned());
        assert!(matches!(oldest.outcome(), Some(Outcome::Computed(v)) if v == "done"));
    }

    #[test]
    fn cancel_all_drains_and_cancels_pending_members() {
        let registry = TestRegistry::new();
        let pending = registry.register(&"k");
        let finished = registry.register(&"k");
        finished.try_settle(Outcome::Computed("done".to_owned()));

        assert_eq!(registry.cancel_all(&"k"), 2);
        assert!(matches!(pending.outcome(), Some(Outcome::Cancelled)));
        assert!(matches!(finished.outcome(), Some(Outcome::Computed(v)) if v == "done"));
        assert!(registry.keys().is_empty());

        assert_eq!(registry.cancel_all(&"k"), 0);
    }

    #[test]
    fn dropping_an_enlistment_cancels_and_unregisters() {
        let registry = Arc::new(TestRegistry::new());
        let enlistment = Enlistment::new(Arc::clone(&registry), "k");
        let computation = Arc::clone(enlistment.computation());

        drop(enlistment);
        assert!(matches!(computation.outcome(), Some(Outcome::Cancelled)));
        assert!(registry.keys().is_empty());
    }

    #[test]
    fn a_settled_enlistment_drops_without_cancelling() {
        let registry = Arc::new(TestRegistry::new());
        let enlistment = Enlistment::new(Arc::clone(&registry), "k");
        let computation = Arc::clone(enlistment.computation());
        computation.try_settle(Outcome::Computed("v".to_owned()));

        drop(enlistment);
        assert!(matches!(computation.outcome(), Some(Outcome::Computed(v)) if v == "v"));
        assert!(registry.keys().is_empty());
    }
}
