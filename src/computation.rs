use tokio::sync::watch;

use crate::error::SharedError;

/// Terminal state of a computation cell.
#[derive(Debug)]
pub(crate) enum Outcome<V, E> {
    /// A producer finished with this value. Not necessarily the value of the
    /// producer that registered the cell: a faster sibling publishes its own
    /// result into every older, still-pending cell.
    Computed(V),
    /// A concurrent remove or clear short-circuited the computation. Waiters
    /// observe nothing; the producer still returns its own value to its own
    /// caller.
    Cancelled,
    /// The producer raised. The cause is shared between the producer's
    /// caller and every waiter.
    Failed(SharedError<E>),
}

impl<V, E> Clone for Outcome<V, E>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Computed(value) => Self::Computed(value.clone()),
            Self::Cancelled => Self::Cancelled,
            Self::Failed(error) => Self::Failed(error.clone()),
        }
    }
}

/// A single-assignment cell a reader can block on until a producer, remove,
/// or clear settles it.
///
/// The cell starts out pending and transitions exactly once, under a
/// compare-and-set discipline; every later settlement attempt is a no-op.
pub(crate) struct Computation<V, E> {
    outcome: watch::Sender<Option<Outcome<V, E>>>,
}

impl<V, E> Computation<V, E>
where
    V: Clone,
{
    pub(crate) fn new() -> Self {
        let (outcome, _) = watch::channel(None);
        Self { outcome }
    }

    /// Settles the cell if it is still pending. Returns whether this call
    /// performed the transition.
    pub(crate) fn try_settle(&self, outcome: Outcome<V, E>) -> bool {
        self.outcome.send_if_modified(move |slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                true
            }
            else {
                false
            }
        })
    }

    #[allow(dead_code)]
    #[inline]
    pub(crate) fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// A snapshot of the current state; `None` while still pending.
    pub(crate) fn outcome(&self) -> Option<Outcome<V, E>> {
        self.outcome.borrow().clone()
    }

    /// Blocks until the cell settles and clones the outcome out.
    pub(crate) async fn wait(&self) -> Outcome<V, E> {
        let mut receiver = self.outcome.subscribe();
        let result = match receiver.wait_for(|slot| slot.is_some()).await {
            Ok(settled) => settled.clone().unwrap_or(Outcome::Cancelled),
            Err(_) => Outcome::Cancelled,
        };
        result
    }
}
