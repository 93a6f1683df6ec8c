//! TTL Sweeper Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ttl_cache::CacheCore;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task alternates between a timed wait and one sweep pass. The wait is
/// interruptible: a `shutdown` notification ends the task immediately
/// instead of letting it sleep out the interval. The task holds only a weak
/// reference to the cache core, so it also ends on its own once every cache
/// handle has been dropped.
///
/// # Arguments
/// * `cache` - Weak reference to the shared cache core
/// * `interval` - Time between sweep passes
/// * `shutdown` - Notified once when the cache shuts down
///
/// # Returns
/// A JoinHandle for the spawned task.
pub(crate) fn spawn_sweeper<K, V>(
    cache: Weak<CacheCore<K, V>>,
    interval: Duration,
    shutdown: Arc<Notify>,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL sweeper with interval of {} ms",
            interval.as_millis()
        );

        loop {
            // Wait out the interval, unless shutdown interrupts it
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.notified() => break,
            }

            // The cache may have been dropped or shut down while we slept
            let Some(cache) = cache.upgrade() else {
                break;
            };
            if cache.is_stopped() {
                break;
            }

            let removed = cache.sweep();
            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }

        debug!("TTL sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::config::CacheConfig;

    fn sweeper_config() -> CacheConfig {
        CacheConfig::default()
            .with_max_size(100)
            .with_ttl(Duration::from_millis(40))
            .with_sweep_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = TtlCache::with_sweeper(sweeper_config()).unwrap();

        cache.put("expire_soon".to_string(), "value".to_string());

        // Wait for the entry to expire and the sweeper to fire
        tokio::time::sleep(Duration::from_millis(120)).await;

        // No get ever touched the key; the background sweep removed it
        assert_eq!(cache.size(), 0);

        cache.shutdown();
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let config = sweeper_config().with_ttl(Duration::from_secs(3600));
        let cache = TtlCache::with_sweeper(config).unwrap();

        cache.put("long_lived".to_string(), "value".to_string());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(
            cache.get(&"long_lived".to_string()),
            Some("value".to_string())
        );

        cache.shutdown();
    }

    #[tokio::test]
    async fn test_sweeper_halts_on_shutdown() {
        let cache = TtlCache::with_sweeper(sweeper_config()).unwrap();

        cache.put("a".to_string(), 1);
        cache.shutdown();

        // Entries now outlive their TTL with no automatic removal
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.size(), 1);

        // Manual sweeping remains valid after shutdown
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_cache_dropped() {
        let cache = TtlCache::<String, i32>::with_sweeper(sweeper_config()).unwrap();
        drop(cache);

        // The weak upgrade fails on the next firing; nothing to assert
        // beyond the task not keeping the runtime alive or panicking.
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
}
