use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

/// A producer failure shared between the producer's own caller and every
/// reader waiting on the computation.
///
/// The failure is routed to the computation cell exactly once; each delivery
/// clones this handle, so the original cause is preserved verbatim for all
/// parties and can be inspected through [`inner`](SharedError::inner) or the
/// standard [`source`](Error::source) chain.
pub struct SharedError<E>(Arc<E>);

impl<E> SharedError<E> {
    pub(crate) fn new(error: E) -> Self {
        Self(Arc::new(error))
    }

    /// The original error raised by the producer.
    #[inline]
    pub fn inner(&self) -> &E {
        &self.0
    }
}

impl<E> Clone for SharedError<E> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<E> Debug for SharedError<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl<E> Display for SharedError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<E> Error for SharedError<E>
where
    E: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Everything a [`ComputingCache`](crate::ComputingCache) operation can fail
/// with.
///
/// `S` is the backend's error type, `E` the error type of user producers.
/// Cancellation is deliberately absent: a computation cancelled by a
/// concurrent remove or clear is a clean `None` for readers, not an error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError<S, E>
where
    S: Error + 'static,
    E: Error + 'static,
{
    /// The backing store failed while serving the request. Propagated
    /// unchanged; the cache does not retry.
    #[error("cache backend operation failed")]
    Backend(#[source] S),

    /// A producer raised while computing a value. The same cause is
    /// delivered to the producer's caller and to every waiting reader.
    #[error("value computation failed")]
    Computation(#[source] SharedError<E>),
}
