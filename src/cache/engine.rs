//! Cache Engine Module
//!
//! Thread-safe MRU cache combining the recency index, per-entry expiration,
//! statistics and the background sweeper.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::cache::entry::{Entry, EntryOptions, EntrySnapshot};
use crate::cache::recency::RecencyIndex;
use crate::cache::stats::{fill_rate, CacheInfo, CacheStats, StatsTracker};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::sweeper::{self, SweepControl};

// == Engine State ==
/// Everything guarded by the engine lock.
pub(crate) struct State<K, V, X> {
    pub(crate) index: RecencyIndex<K, V, X>,
    capacity: usize,
    stats: StatsTracker,
    update_time_on_hit: bool,
}

impl<K, V, X> State<K, V, X>
where
    K: Hash + Eq + Clone,
{
    /// Evicts from the tail until at most `limit` entries remain.
    fn shrink_to(&mut self, limit: usize) -> Vec<Entry<K, V, X>> {
        let mut evicted = Vec::new();
        while self.index.len() > limit {
            match self.index.pop_tail() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        self.stats.record_evictions(evicted.len());
        evicted
    }

    /// Replaces any entry for the key, makes room, and links the new entry
    /// at the head. Returns the displaced entries so they can be dropped
    /// after the lock is released.
    fn insert(&mut self, key: K, value: V, options: EntryOptions<X>) -> Vec<Entry<K, V, X>> {
        let mut displaced = Vec::new();
        if self.capacity == 0 {
            return displaced;
        }

        if let Some(old) = self.index.remove(&key) {
            displaced.push(old);
        }
        displaced.extend(self.shrink_to(self.capacity - 1));

        self.index
            .insert(Entry::new(key, value, options, Instant::now()));
        displaced
    }

    /// Looks up `key`, touching it on hit. A TTL-expired entry is removed
    /// and reported as a miss.
    fn lookup<Q>(&mut self, key: &Q, now: Instant) -> (Option<usize>, Option<Entry<K, V, X>>)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.stats.record_request();
        let Some(idx) = self.index.index_of(key) else {
            return (None, None);
        };

        if self.index.entry(idx).is_ttl_expired(now) {
            self.stats.record_expirations(1);
            return (None, Some(self.index.remove_at(idx)));
        }

        self.stats.record_hit();
        self.index.move_to_head(idx);
        let refresh = self.update_time_on_hit;
        self.index.entry_mut(idx).touch(now, refresh);
        (Some(idx), None)
    }
}

// == Shared ==
/// State shared between engine handles and the sweeper thread.
pub(crate) struct Shared<K, V, X> {
    pub(crate) state: RwLock<State<K, V, X>>,
    pub(crate) sweep: SweepControl,
}

impl<K, V, X> Shared<K, V, X>
where
    K: Hash + Eq + Clone,
{
    /// Removes every entry whose TTL or idle survival ran out at `now`.
    ///
    /// The whole pass runs under the write lock; removed values are dropped
    /// after it is released.
    pub(crate) fn sweep_pass(&self, now: Instant, default_survive: Option<Duration>) -> usize {
        let expired = {
            let mut state = self.state.write();
            let expired = state
                .index
                .drain_where(|entry| entry.is_expired(now, default_survive));
            state.stats.record_expirations(expired.len());
            expired
        };
        expired.len()
    }
}

// == Cache Engine ==
/// Capacity-bounded cache with strict LRU eviction.
///
/// Handles are cheap to clone and share the same cache. `X` is the type of
/// the opaque context and sub-context tags an entry may carry.
///
/// Lookups move the touched entry to the head of the recency chain, so
/// `get` takes the write lock just like `put`. Only `traverse`, `contains`,
/// `peek` and the size/statistics accessors take the read lock.
///
/// An entry whose TTL has run out is never reported, even before a lookup
/// or sweep physically removes it. `len`, `stats` and `info` count stored
/// entries and may include such an entry until then.
pub struct CacheEngine<K, V, X = ()> {
    pub(crate) shared: Arc<Shared<K, V, X>>,
}

impl<K, V, X> Clone for CacheEngine<K, V, X> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V, X> fmt::Debug for CacheEngine<K, V, X>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read_recursive();
        f.debug_struct("CacheEngine")
            .field("capacity", &state.capacity)
            .field("size", &state.index.len())
            .field("sweep_running", &self.shared.sweep.is_running())
            .finish()
    }
}

impl<K, V, X> CacheEngine<K, V, X>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty engine holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    index: RecencyIndex::new(),
                    capacity,
                    stats: StatsTracker::new(),
                    update_time_on_hit: true,
                }),
                sweep: SweepControl::new(),
            }),
        }
    }

    /// Shared access for the read-only accessors. Recursive, so a `traverse`
    /// visitor can call them while a writer is queued.
    fn read_state(&self) -> RwLockReadGuard<'_, State<K, V, X>> {
        self.shared.state.read_recursive()
    }

    // == Get ==
    /// Returns the value for `key`, making it the most recently used entry.
    ///
    /// Every call counts as a request; a hit also bumps the entry's hit
    /// counter and, when enabled, refreshes its access time.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        // `_expired` outlives the guard so a removed value drops unlocked
        let (value, _expired) = {
            let mut state = self.shared.state.write();
            let (hit, expired) = state.lookup(key, Instant::now());
            let value = hit.map(|idx| state.index.entry(idx).value.clone());
            (value, expired)
        };
        value
    }

    /// [`get`](Self::get) that also returns the entry metadata as of this hit.
    pub fn get_with_stats<Q>(&self, key: &Q) -> Option<(V, EntrySnapshot<X>)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        X: Clone,
    {
        let now = Instant::now();
        // Dropped after the guard, see `get`
        let (found, _expired) = {
            let mut state = self.shared.state.write();
            let (hit, expired) = state.lookup(key, now);
            let found = hit.map(|idx| {
                let entry = state.index.entry(idx);
                (entry.value.clone(), entry.snapshot(now))
            });
            (found, expired)
        };
        found
    }

    /// Like [`get`](Self::get), but only returns entries inserted at or after
    /// `since`. An older entry counts as a miss and is left in place.
    pub fn get_if_newer<Q>(&self, key: &Q, since: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.shared.state.write();
        let fresh = state
            .index
            .get(key)
            .map(|entry| entry.created_at >= since)
            .unwrap_or(false);
        if !fresh {
            state.stats.record_request();
            return None;
        }
        let (hit, _) = state.lookup(key, Instant::now());
        hit.map(|idx| state.index.entry(idx).value.clone())
    }

    // == Get Or Create ==
    /// Returns the cached value or builds, stores and returns a new one.
    ///
    /// `supplier` runs without the engine lock held, so two callers racing
    /// on the same absent key may both run it. Only one entry survives; the
    /// caller that loses the race gets the winner's value.
    ///
    /// A panicking supplier is caught and logged. The cache is left as it
    /// was and `None` is returned.
    pub fn get_or_create<F>(&self, key: K, supplier: F) -> Option<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return Some(value);
        }
        match panic::catch_unwind(AssertUnwindSafe(supplier)) {
            Ok(value) => Some(self.insert_if_absent(key, value)),
            Err(_) => {
                warn!("get_or_create: supplier panicked, nothing was cached");
                None
            }
        }
    }

    /// Fallible [`get_or_create`](Self::get_or_create). A supplier error is
    /// logged and reported as `None`, leaving the cache untouched.
    pub fn try_get_or_create<F, E>(&self, key: K, supplier: F) -> Option<V>
    where
        F: FnOnce() -> std::result::Result<V, E>,
        E: fmt::Display,
    {
        if let Some(value) = self.get(&key) {
            return Some(value);
        }
        match panic::catch_unwind(AssertUnwindSafe(supplier)) {
            Ok(Ok(value)) => Some(self.insert_if_absent(key, value)),
            Ok(Err(err)) => {
                warn!("try_get_or_create: supplier failed: {}", err);
                None
            }
            Err(_) => {
                warn!("try_get_or_create: supplier panicked, nothing was cached");
                None
            }
        }
    }

    fn insert_if_absent(&self, key: K, value: V) -> V {
        let (value, _displaced) = {
            let mut state = self.shared.state.write();
            let now = Instant::now();
            let cached = state
                .index
                .get(&key)
                .filter(|entry| !entry.is_ttl_expired(now))
                .map(|entry| entry.value.clone());
            match cached {
                Some(cached) => {
                    debug!("get_or_create lost the race, keeping the cached value");
                    (cached, Vec::new())
                }
                None => {
                    let displaced = state.insert(key, value.clone(), EntryOptions::new());
                    (value, displaced)
                }
            }
        };
        value
    }

    // == Put ==
    /// Stores `value` under `key` with default options.
    pub fn put(&self, key: K, value: V) {
        self.put_with(key, value, EntryOptions::new());
    }

    /// Stores `value` under `key`.
    ///
    /// An existing entry for the key is replaced, resetting its recency and
    /// hit count. When the cache is full the least recently used entry is
    /// evicted first. With a capacity of zero the value is discarded.
    pub fn put_with(&self, key: K, value: V, options: EntryOptions<X>) {
        let _displaced = self.shared.state.write().insert(key, value, options);
    }

    // == Remove ==
    /// Removes the entry for `key`, returning whether one existed.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.shared.state.write().index.remove(key);
        removed.is_some()
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        let _drained = {
            let mut state = self.shared.state.write();
            state.stats.reset();
            state.index.clear()
        };
    }

    // == Read-only Access ==
    /// True when a live entry exists for `key`. Does not touch recency or
    /// statistics.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.read_state()
            .index
            .get(key)
            .map(|entry| !entry.is_ttl_expired(now))
            .unwrap_or(false)
    }

    /// Returns the value without touching recency or statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        self.read_state()
            .index
            .get(key)
            .filter(|entry| !entry.is_ttl_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Visits every live entry in lookup order under the read lock.
    ///
    /// Entries whose TTL has run out are skipped even if no lookup or sweep
    /// has removed them yet. The visitor may call the read-only accessors
    /// (`contains`, `peek`, `len`, ...) but must not call `get`, `put` or any
    /// other method that takes the write lock: that deadlocks against the
    /// read lock held here.
    pub fn traverse<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V),
    {
        let now = Instant::now();
        let state = self.read_state();
        for entry in state.index.iter().filter(|entry| !entry.is_ttl_expired(now)) {
            visitor(&entry.key, &entry.value);
        }
    }

    /// Live keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let now = Instant::now();
        self.read_state()
            .index
            .iter_recency()
            .filter(|entry| !entry.is_ttl_expired(now))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Most recently used live key.
    pub fn most_recent_key(&self) -> Option<K> {
        let now = Instant::now();
        self.read_state()
            .index
            .iter_recency()
            .find(|entry| !entry.is_ttl_expired(now))
            .map(|entry| entry.key.clone())
    }

    /// Least recently used live key, the next one to be evicted. Walks the
    /// whole chain.
    pub fn least_recent_key(&self) -> Option<K> {
        let now = Instant::now();
        self.read_state()
            .index
            .iter_recency()
            .filter(|entry| !entry.is_ttl_expired(now))
            .last()
            .map(|entry| entry.key.clone())
    }

    /// Metadata of the live entry for `key`.
    pub fn entry_stats<Q>(&self, key: &Q) -> Option<EntrySnapshot<X>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        X: Clone,
    {
        let now = Instant::now();
        self.read_state()
            .index
            .get(key)
            .filter(|entry| !entry.is_ttl_expired(now))
            .map(|entry| entry.snapshot(now))
    }

    // == Capacity ==
    /// Changes the capacity, evicting from the tail until the cache fits.
    pub fn set_capacity(&self, capacity: i64) -> Result<()> {
        if capacity < 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        let capacity = usize::try_from(capacity).unwrap_or(usize::MAX);

        let _evicted = {
            let mut state = self.shared.state.write();
            state.capacity = capacity;
            let evicted = state.shrink_to(capacity);
            if !evicted.is_empty() {
                debug!(
                    "Capacity set to {}, evicted {} entries",
                    capacity,
                    evicted.len()
                );
            }
            evicted
        };
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.read_state().capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.read_state().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().index.is_empty()
    }

    // == Statistics ==
    /// size / capacity, 1.0 for a zero-capacity cache.
    pub fn fill_rate(&self) -> f64 {
        let state = self.read_state();
        fill_rate(state.index.len(), state.capacity)
    }

    /// hits / requests, 1.0 before the first request.
    pub fn hit_rate(&self) -> f64 {
        self.read_state().stats.hit_rate()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.read_state();
        state.stats.snapshot(state.index.len(), state.capacity)
    }

    /// Diagnostic snapshot for logging and monitoring.
    pub fn info(&self) -> CacheInfo {
        let (capacity, size, hit_rate) = {
            let state = self.read_state();
            (state.capacity, state.index.len(), state.stats.hit_rate())
        };
        CacheInfo {
            capacity,
            size,
            fill_rate: fill_rate(size, capacity),
            hit_rate,
            sweep_running: self.shared.sweep.is_running(),
            interval_ms: self.shared.sweep.interval_ms(),
            survive_time_ms: self.shared.sweep.survive_time_ms(),
        }
    }

    /// Whether a hit refreshes the entry's last-access time.
    pub fn update_time_on_hit(&self) -> bool {
        self.read_state().update_time_on_hit
    }

    pub fn set_update_time_on_hit(&self, enabled: bool) {
        self.shared.state.write().update_time_on_hit = enabled;
    }

    // == Expiration ==
    /// Runs one sweep pass now, using `default_survive` for entries without
    /// their own survive time. Returns the number of removed entries.
    pub fn purge_expired(&self, default_survive: Option<Duration>) -> usize {
        self.shared.sweep_pass(Instant::now(), default_survive)
    }
}

impl<K, V, X> CacheEngine<K, V, X>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    X: Send + Sync + 'static,
{
    /// Creates an engine from configuration, starting the sweeper when a
    /// non-zero interval is configured.
    pub fn from_config(config: &Config) -> Self {
        let engine = Self::new(config.capacity);
        engine.set_update_time_on_hit(config.update_time_on_hit);
        engine
            .shared
            .sweep
            .set_survive_time(config.survive_time());
        if config.sweep_interval_ms > 0 {
            engine.enable_periodic_sweep(config.sweep_interval(), config.survive_time(), None);
        }
        engine
    }

    // == Sweeper Control ==
    /// Starts the background sweeper on a dedicated thread.
    ///
    /// Ignored unless both durations are non-zero; a no-op while a sweeper
    /// is already running. Returns whether a new sweeper was started.
    pub fn enable_periodic_sweep(
        &self,
        interval: Duration,
        survive_time: Duration,
        thread_name: Option<&str>,
    ) -> bool {
        sweeper::enable(&self.shared, interval, survive_time, thread_name)
    }

    /// Asks the sweeper to stop at its next wake-up.
    pub fn disable_periodic_sweep(&self) {
        sweeper::disable(&self.shared);
    }

    pub fn is_sweep_running(&self) -> bool {
        self.shared.sweep.is_running()
    }
}
