//! TTL Cache Module
//!
//! The public cache engine combining the entry store, the candidate queue,
//! capacity eviction and TTL sweeping.

use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheStats, CandidateQueue, EntryStore, SlotState, StatsSnapshot};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::spawn_sweeper;

// == Cache Core ==
/// State shared by every cache handle and the background sweeper.
#[derive(Debug)]
pub(crate) struct CacheCore<K, V> {
    /// Ground truth for cached entries
    pub(crate) store: EntryStore<K, V>,
    /// Insertion-order markers feeding eviction and expiry
    pub(crate) queue: CandidateQueue<K>,
    /// Performance counters
    pub(crate) stats: CacheStats,
    /// Immutable construction-time settings
    pub(crate) config: CacheConfig,
    /// Set once by `shutdown`; halts the background sweeper
    stopped: AtomicBool,
    /// Interrupts the sweeper's timed wait on shutdown
    shutdown: Arc<Notify>,
    /// Handle of the spawned sweeper, if any
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> CacheCore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Enforce Capacity ==
    /// Drains the candidate queue head while the store exceeds capacity.
    ///
    /// A popped marker whose stamp no longer matches the store is stale
    /// garbage and is discarded with no effect; a conditional removal lost
    /// to a concurrent overwrite is absorbed the same way. Terminates when
    /// the queue runs out even if still over capacity: a burst of
    /// concurrent puts may overshoot transiently, and later puts drain the
    /// excess rather than anyone spinning here.
    fn enforce_capacity(&self) {
        while self.store.len() > self.config.max_size {
            let Some(marker) = self.queue.pop_oldest() else {
                break;
            };
            if self.store.remove_if_matches(&marker.key, marker.inserted_at) {
                self.stats.record_eviction();
            }
        }
    }

    // == Sweep ==
    /// Removes every expired entry reachable from the queue head.
    ///
    /// Markers are peeked, classified against the store, and only then
    /// popped, and only while still at the head, so a marker consumed by a
    /// concurrent sweep or eviction is never mistaken for the one
    /// classified here. The loop stops at the first fresh head: the queue
    /// is in insertion order and the TTL is uniform, so nothing behind a
    /// fresh marker can be expired. That early exit keeps a sweep
    /// O(expired) instead of O(total).
    pub(crate) fn sweep(&self) -> usize {
        let mut removed = 0;
        loop {
            let Some(marker) = self.queue.peek_oldest() else {
                break;
            };
            match self
                .store
                .state_of(&marker.key, marker.inserted_at, self.config.ttl)
            {
                SlotState::Fresh => break,
                SlotState::Missing | SlotState::Stale => {
                    // Garbage marker; drop it without touching the store
                    self.queue.pop_if_oldest(&marker);
                }
                SlotState::Expired => {
                    if self.queue.pop_if_oldest(&marker)
                        && self.store.remove_if_matches(&marker.key, marker.inserted_at)
                    {
                        self.stats.record_expiration();
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    // == Is Stopped ==
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// == TTL Cache ==
/// A bounded, concurrent, time-expiring key/value cache.
///
/// Entries are evicted oldest-first once `max_size` is exceeded and expire
/// independently once their uniform TTL elapses, lazily on read, and via a
/// periodic background sweep when constructed with [`TtlCache::with_sweeper`].
///
/// Handles are cheap to clone and share all state; `put` and `get` never
/// block on one another beyond single-key atomicity.
pub struct TtlCache<K, V> {
    pub(crate) core: Arc<CacheCore<K, V>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("config", &self.core.config)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new cache without a background sweeper.
    ///
    /// Expired entries are still removed lazily on read and by manual
    /// [`TtlCache::sweep_expired`] calls. Does not require an async runtime.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(CacheCore {
                store: EntryStore::new(),
                queue: CandidateQueue::new(),
                stats: CacheStats::new(),
                config,
                stopped: AtomicBool::new(false),
                shutdown: Arc::new(Notify::new()),
                sweeper: Mutex::new(None),
            }),
        })
    }

    // == Constructor With Sweeper ==
    /// Creates a new cache and starts the periodic background sweeper.
    ///
    /// Must be called from within a Tokio runtime. The sweeper fires every
    /// `sweep_interval` until [`TtlCache::shutdown`] is called or every
    /// handle to the cache has been dropped.
    pub fn with_sweeper(config: CacheConfig) -> Result<Self>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let cache = Self::new(config)?;
        cache.start_sweeper();
        Ok(cache)
    }

    // == Start Sweeper ==
    /// Spawns the periodic sweeper if it is not already running.
    ///
    /// No-op after `shutdown`. The task holds only a weak reference to the
    /// cache, so it never keeps a dropped cache alive.
    pub fn start_sweeper(&self)
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let mut sweeper = self.core.sweeper.lock();
        if sweeper.is_some() || self.core.is_stopped() {
            return;
        }
        *sweeper = Some(spawn_sweeper(
            Arc::downgrade(&self.core),
            self.core.config.sweep_interval,
            Arc::clone(&self.core.shutdown),
        ));
    }

    // == Put ==
    /// Stores a key-value pair.
    ///
    /// The previous entry for the key, if any, is replaced wholesale with a
    /// fresh timestamp; its queued markers become stale. A new marker is
    /// always appended, then capacity eviction runs inline, so a
    /// single-threaded caller observes `size() <= max_size` as soon as
    /// `put` returns.
    pub fn put(&self, key: K, value: V) {
        let inserted_at = self.core.store.upsert(key.clone(), value);
        self.core.queue.append(key, inserted_at);
        self.core.enforce_capacity();
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if present and fresh. An expired entry is removed
    /// on the spot and reported as absent; the removal never touches the
    /// candidate queue; the dangling marker is reconciled away later by
    /// the sweeper or the eviction loop.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.core.store.get_if_fresh(key, self.core.config.ttl) {
            Some(value) => {
                self.core.stats.record_hit();
                Some(value)
            }
            None => {
                self.core.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Removes an entry by key, returning its value.
    ///
    /// Markers left behind in the queue go stale and are discarded on their
    /// next dequeue.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.core.store.remove(key)
    }

    // == Size ==
    /// Returns the point-in-time count of live entries.
    ///
    /// This counts store entries, not queue markers; the queue may be
    /// longer while stale markers await reconciliation.
    pub fn size(&self) -> usize {
        self.core.store.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.core.store.is_empty()
    }

    // == TTL Remaining ==
    /// Returns the remaining lifetime of a live entry.
    ///
    /// Useful for debugging and statistics purposes.
    pub fn ttl_remaining(&self, key: &K) -> Option<Duration> {
        self.core.store.remaining(key, self.core.config.ttl)
    }

    // == Sweep Expired ==
    /// Removes all currently expired entries, returning how many.
    ///
    /// This is the same pass the background sweeper runs; it can be called
    /// manually at any time, including after `shutdown`.
    pub fn sweep_expired(&self) -> usize {
        self.core.sweep()
    }

    // == Stats ==
    /// Returns a point-in-time snapshot of the cache metrics.
    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot(self.core.store.len())
    }

    // == Config ==
    /// Returns the construction-time configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.core.config
    }

    // == Shutdown ==
    /// Halts the background sweeper.
    ///
    /// Idempotent and safe to call concurrently with in-flight operations.
    /// The sweeper's timed wait is interrupted promptly rather than letting
    /// it fire once more. `put`, `get` and manual `sweep_expired` all keep
    /// working afterwards; only automatic sweeping stops.
    pub fn shutdown(&self) {
        if self.core.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.core.shutdown.notify_one();
        debug!("Cache shutdown signaled, background sweeper will halt");
    }
}
