use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::expiration::CacheExpiration;

/// A cached value together with the bookkeeping its expiration needs.
///
/// The entry records its creation time and, for idle tracking, the offset of
/// the most recent successful read. Backends own the storage of entries;
/// nothing outside the crate ever sees one.
#[derive(Debug)]
pub(crate) struct ExpirableEntry<V> {
    value:      V,
    expiration: CacheExpiration,
    created_at: Instant,
    // Nanoseconds between creation and the most recent successful read.
    last_access: AtomicU64,
}

impl<V> ExpirableEntry<V> {
    pub(crate) fn new(value: V, expiration: CacheExpiration) -> Self {
        Self {
            value,
            expiration,
            created_at: Instant::now(),
            last_access: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    /// Elapsed time since the entry was created.
    pub(crate) fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Refreshes the idle window. Call only after a successful, non-expired
    /// read; concurrent reads may race here and both count as the latest.
    pub(crate) fn touch(&self) {
        self.last_access
            .store(self.age().as_nanos() as u64, Ordering::Release);
    }

    pub(crate) fn is_expired(&self) -> bool {
        if self.expiration.is_eternal() {
            return false;
        }

        let age = self.age();
        let life_time = self.expiration.life_time();
        if !life_time.is_zero() && age > life_time {
            return true;
        }

        let idle_time = self.expiration.idle_time();
        if !idle_time.is_zero() {
            let last_access = Duration::from_nanos(self.last_access.load(Ordering::Acquire));
            if age.saturating_sub(last_access) > idle_time {
                return true;
            }
        }

        false
    }

    /// How long the entry may still live, assuming no further reads. `None`
    /// means the entry never expires by time.
    pub(crate) fn time_to_expiry(&self) -> Option<Duration> {
        if self.expiration.is_eternal() {
            return None;
        }

        let mut next = None;
        let life_time = self.expiration.life_time();
        if !life_time.is_zero() {
            next = Some(life_time.saturating_sub(self.age()));
        }
        let idle_time = self.expiration.idle_time();
        if !idle_time.is_zero() {
            next = Some(next.map_or(idle_time, |until_death: Duration| until_death.min(idle_time)));
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn eternal_never_expires() {
        let entry = ExpirableEntry::new("v", CacheExpiration::ETERNAL);
        sleep(Duration::from_millis(30));
        assert!(!entry.is_expired());
        assert_eq!(entry.time_to_expiry(), None);
    }

    #[test]
    fn expires_past_life_time() {
        let entry = ExpirableEntry::new("v", CacheExpiration::with_life_time(Duration::from_millis(60)));
        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
    }

    #[test]
    fn touch_refreshes_the_idle_window() {
        let entry = ExpirableEntry::new("v", CacheExpiration::with_idle_time(Duration::from_millis(150)));
        sleep(Duration::from_millis(100));
        assert!(!entry.is_expired());
        entry.touch();
        sleep(Duration::from_millis(100));
        // 200ms old but read 100ms ago, still within the idle window.
        assert!(!entry.is_expired());
        sleep(Duration::from_millis(250));
        assert!(entry.is_expired());
    }

    #[test]
    fn life_bound_wins_over_a_busy_reader() {
        let expiration = CacheExpiration::new(Duration::from_millis(150), Duration::from_millis(150));
        let entry = ExpirableEntry::new("v", expiration);
        sleep(Duration::from_millis(100));
        entry.touch();
        sleep(Duration::from_millis(100));
        // The idle window was refreshed but the life time has elapsed.
        assert!(entry.is_expired());
    }

    #[test]
    fn time_to_expiry_takes_the_nearer_bound() {
        let entry = ExpirableEntry::new("v", CacheExpiration::new(Duration::from_secs(60), Duration::from_secs(10)));
        let next = entry.time_to_expiry().unwrap();
        assert!(next <= Duration::from_secs(10));
    }
}
