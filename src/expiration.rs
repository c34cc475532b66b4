use std::time::Duration;

/// Describes when a cache entry expires.
///
/// The life time is a hard upper bound counted from insertion. The idle time
/// is the maximum gap between two successful reads before the entry is
/// considered gone. A zero duration disables the corresponding bound, so an
/// expiration with both set to zero never expires by time at all; that is
/// what [`CacheExpiration::ETERNAL`] is.
///
/// ```
/// use std::time::Duration;
/// use compute_cache::expiration::CacheExpiration;
///
/// let expiration = CacheExpiration::with_life_time(Duration::from_secs(300));
/// assert!(!expiration.is_eternal());
/// assert_eq!(expiration.idle_time(), Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CacheExpiration {
    life_time: Duration,
    idle_time: Duration,
}

impl CacheExpiration {
    /// Never expires by time. The backend may still evict the entry under
    /// memory pressure or a size cap.
    pub const ETERNAL: CacheExpiration = CacheExpiration {
        life_time: Duration::ZERO,
        idle_time: Duration::ZERO,
    };

    /// An expiration with both a life and an idle bound.
    pub fn new(life_time: Duration, idle_time: Duration) -> Self {
        Self { life_time, idle_time }
    }

    /// A life-time-only expiration.
    pub fn with_life_time(life_time: Duration) -> Self {
        Self {
            life_time,
            idle_time: Duration::ZERO,
        }
    }

    /// An idle-time-only expiration.
    pub fn with_idle_time(idle_time: Duration) -> Self {
        Self {
            life_time: Duration::ZERO,
            idle_time,
        }
    }

    #[inline]
    pub fn life_time(&self) -> Duration {
        self.life_time
    }

    #[inline]
    pub fn idle_time(&self) -> Duration {
        self.idle_time
    }

    #[inline]
    pub fn is_eternal(&self) -> bool {
        self.life_time.is_zero() && self.idle_time.is_zero()
    }
}
