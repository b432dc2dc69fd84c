//! Cache Entry Module
//!
//! Defines the node stored in the recency chain, with TTL and idle-survival
//! bookkeeping.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

// == Entry Options ==
/// Per-entry settings accepted by [`CacheEngine::put_with`](crate::cache::CacheEngine::put_with).
///
/// `survive_time` of `None` means the engine default idle survival applies.
/// `ttl` of `None` (or zero) means the entry has no absolute lifetime.
#[derive(Debug, Clone)]
pub struct EntryOptions<X = ()> {
    /// Opaque context tag
    pub context: Option<X>,
    /// Opaque sub-context tag
    pub sub_context: Option<X>,
    /// Idle survival override
    pub survive_time: Option<Duration>,
    /// Absolute time-to-live measured from creation
    pub ttl: Option<Duration>,
}

impl<X> Default for EntryOptions<X> {
    fn default() -> Self {
        Self {
            context: None,
            sub_context: None,
            survive_time: None,
            ttl: None,
        }
    }
}

impl<X> EntryOptions<X> {
    /// Creates options with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: X) -> Self {
        self.context = Some(context);
        self
    }

    pub fn sub_context(mut self, sub_context: X) -> Self {
        self.sub_context = Some(sub_context);
        self
    }

    pub fn survive_time(mut self, survive_time: Duration) -> Self {
        self.survive_time = Some(survive_time);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Cache Entry ==
/// A single node of the recency chain.
///
/// `prev` points towards the head (more recently used), `next` towards the
/// tail. Both are slot indices owned by [`RecencyIndex`](super::recency::RecencyIndex).
#[derive(Debug)]
pub(crate) struct Entry<K, V, X> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) context: Option<X>,
    pub(crate) sub_context: Option<X>,
    pub(crate) survive_time: Option<Duration>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) created_at: Instant,
    pub(crate) last_access_at: Instant,
    pub(crate) inserted_at: DateTime<Utc>,
    pub(crate) hit_count: u64,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
}

impl<K, V, X> Entry<K, V, X> {
    // == Constructor ==
    /// Creates an unlinked entry stamped with the given creation time.
    pub(crate) fn new(key: K, value: V, options: EntryOptions<X>, now: Instant) -> Self {
        Self {
            key,
            value,
            context: options.context,
            sub_context: options.sub_context,
            survive_time: options.survive_time,
            // A zero TTL is the same as no TTL
            ttl: options.ttl.filter(|ttl| !ttl.is_zero()),
            created_at: now,
            last_access_at: now,
            inserted_at: Utc::now(),
            hit_count: 0,
            prev: None,
            next: None,
        }
    }

    // == Touch ==
    /// Records a hit, refreshing the access time only when asked to.
    pub(crate) fn touch(&mut self, now: Instant, refresh_access_time: bool) {
        self.hit_count += 1;
        if refresh_access_time {
            self.last_access_at = now;
        }
    }

    /// Time since the last access.
    pub(crate) fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access_at)
    }

    /// Time since creation.
    pub(crate) fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    // == Expiration ==
    /// True once the absolute lifetime has fully elapsed.
    ///
    /// Boundary: an entry whose age equals its TTL is expired.
    pub(crate) fn is_ttl_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => self.age(now) >= ttl,
            None => false,
        }
    }

    /// True when the entry has been idle longer than its survive time.
    ///
    /// The entry's own survive time wins over `default_survive`. With neither
    /// set, idleness never expires the entry.
    pub(crate) fn is_idle_expired(&self, now: Instant, default_survive: Option<Duration>) -> bool {
        match self.survive_time.or(default_survive) {
            Some(survive) => self.idle(now) > survive,
            None => false,
        }
    }

    /// Combined sweep eligibility.
    pub(crate) fn is_expired(&self, now: Instant, default_survive: Option<Duration>) -> bool {
        self.is_ttl_expired(now) || self.is_idle_expired(now, default_survive)
    }

    // == Time To Live ==
    /// Remaining lifetime, `Some(ZERO)` once expired, `None` without TTL.
    pub(crate) fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.ttl.map(|ttl| ttl.saturating_sub(self.age(now)))
    }

    /// Builds a read-only view of this entry's metadata.
    pub(crate) fn snapshot(&self, now: Instant) -> EntrySnapshot<X>
    where
        X: Clone,
    {
        EntrySnapshot {
            hit_count: self.hit_count,
            age: self.age(now),
            idle: self.idle(now),
            ttl_remaining: self.ttl_remaining(now),
            survive_time: self.survive_time,
            context: self.context.clone(),
            sub_context: self.sub_context.clone(),
            inserted_at: self.inserted_at,
        }
    }
}

// == Entry Snapshot ==
/// Point-in-time metadata of a live entry, see
/// [`CacheEngine::entry_stats`](crate::cache::CacheEngine::entry_stats).
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot<X = ()> {
    /// Number of hits since insertion
    pub hit_count: u64,
    /// Time since insertion
    pub age: Duration,
    /// Time since last refreshed access
    pub idle: Duration,
    /// Remaining TTL, None when the entry has none
    pub ttl_remaining: Option<Duration>,
    /// Idle survival override
    pub survive_time: Option<Duration>,
    pub context: Option<X>,
    pub sub_context: Option<X>,
    /// Wall-clock insertion time
    pub inserted_at: DateTime<Utc>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(options: EntryOptions<&'static str>, now: Instant) -> Entry<String, String, &'static str> {
        Entry::new("key".to_string(), "value".to_string(), options, now)
    }

    #[test]
    fn test_entry_creation_no_ttl() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new(), now);

        assert_eq!(entry.value, "value");
        assert!(entry.ttl.is_none());
        assert!(entry.prev.is_none() && entry.next.is_none());
        assert!(!entry.is_ttl_expired(now + Duration::from_secs(3600)));
        assert!(entry.ttl_remaining(now).is_none());
    }

    #[test]
    fn test_zero_ttl_means_no_ttl() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new().ttl(Duration::ZERO), now);

        assert!(entry.ttl.is_none());
        assert!(!entry.is_ttl_expired(now + Duration::from_secs(10)));
    }

    #[test]
    fn test_ttl_expiration_boundary() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new().ttl(Duration::from_millis(100)), now);

        assert!(!entry.is_ttl_expired(now + Duration::from_millis(99)));
        assert!(entry.is_ttl_expired(now + Duration::from_millis(100)));
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
        assert_eq!(
            entry.ttl_remaining(now + Duration::from_millis(500)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_ttl_ignores_access_activity() {
        let now = Instant::now();
        let mut entry = entry_with(EntryOptions::new().ttl(Duration::from_millis(100)), now);

        entry.touch(now + Duration::from_millis(90), true);

        assert!(entry.is_ttl_expired(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_idle_uses_default_survive() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new(), now);
        let survive = Some(Duration::from_millis(100));

        assert!(!entry.is_idle_expired(now + Duration::from_millis(100), survive));
        assert!(entry.is_idle_expired(now + Duration::from_millis(101), survive));
        assert!(!entry.is_idle_expired(now + Duration::from_secs(100), None));
    }

    #[test]
    fn test_entry_survive_time_overrides_default() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new().survive_time(Duration::from_millis(500)), now);
        let default_survive = Some(Duration::from_millis(100));

        assert!(!entry.is_expired(now + Duration::from_millis(200), default_survive));
        assert!(entry.is_expired(now + Duration::from_millis(600), default_survive));
    }

    #[test]
    fn test_touch_refreshes_access_time() {
        let now = Instant::now();
        let mut entry = entry_with(EntryOptions::new(), now);
        let later = now + Duration::from_millis(50);

        entry.touch(later, true);
        assert_eq!(entry.hit_count, 1);
        assert_eq!(entry.idle(later), Duration::ZERO);

        entry.touch(later + Duration::from_millis(50), false);
        assert_eq!(entry.hit_count, 2);
        assert_eq!(entry.last_access_at, later);
    }

    #[test]
    fn test_snapshot_carries_context() {
        let now = Instant::now();
        let entry = entry_with(EntryOptions::new().context("ctx").sub_context("sub"), now);

        let snapshot = entry.snapshot(now + Duration::from_millis(10));
        assert_eq!(snapshot.context, Some("ctx"));
        assert_eq!(snapshot.sub_context, Some("sub"));
        assert_eq!(snapshot.age, Duration::from_millis(10));
        assert_eq!(snapshot.hit_count, 0);
    }
}
